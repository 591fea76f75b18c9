//! Live JVM host through a borrowed `JNIEnv`
//!
//! Design: a thin adapter. Every JNI failure clears any pending Java
//! exception before it is reported, so nothing thrown during marshalling is
//! left behind for the host to observe. Temporaries created here are
//! deleted before returning; handles given to the caller come back through
//! [`HostRuntime::release`].

use super::HostRuntime;
use crate::errors::{BridgeError, BridgeResult};
use crate::marshal::{ClassCache, HostValue};
use jni::errors::Error as JniError;
use jni::objects::{GlobalRef, JClass, JObject, JObjectArray, JString, JValue, JValueGen, JValueOwned};
use jni::JNIEnv;
use once_cell::sync::Lazy;

/// Classes resolved through JNI, held as global references for the
/// library's lifetime
pub static JNI_CLASSES: Lazy<ClassCache<GlobalRef>> = Lazy::new(ClassCache::new);

pub struct JniHost<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
}

impl<'a, 'local> JniHost<'a, 'local> {
    pub fn new(env: &'a mut JNIEnv<'local>) -> Self {
        Self { env }
    }

    /// Clear a pending exception raised by the failed call
    fn settle(&mut self, error: JniError) -> BridgeError {
        if matches!(error, JniError::JavaException) || self.env.exception_check().unwrap_or(false) {
            let _ = self.env.exception_clear();
        }
        BridgeError::from(error)
    }
}

fn to_jvalue<'obj, 'local>(value: HostValue<&'obj JObject<'local>>) -> JValue<'local, 'obj> {
    match value {
        HostValue::Byte(v) => JValue::Byte(v),
        HostValue::Short(v) => JValue::Short(v),
        HostValue::Int(v) => JValue::Int(v),
        HostValue::Long(v) => JValue::Long(v),
        HostValue::Float(v) => JValue::Float(v),
        HostValue::Double(v) => JValue::Double(v),
        HostValue::Boolean(v) => JValue::Bool(v),
        HostValue::Char(v) => JValue::Char(v),
        HostValue::Void => JValue::Void,
        HostValue::Object(object) => JValue::Object(object),
    }
}

fn from_jvalue(value: JValueOwned<'_>) -> HostValue<JObject<'_>> {
    match value {
        JValueGen::Byte(v) => HostValue::Byte(v),
        JValueGen::Short(v) => HostValue::Short(v),
        JValueGen::Int(v) => HostValue::Int(v),
        JValueGen::Long(v) => HostValue::Long(v),
        JValueGen::Float(v) => HostValue::Float(v),
        JValueGen::Double(v) => HostValue::Double(v),
        JValueGen::Bool(v) => HostValue::Boolean(v),
        JValueGen::Char(v) => HostValue::Char(v),
        JValueGen::Void => HostValue::Void,
        JValueGen::Object(object) => HostValue::Object(object),
    }
}

impl<'a, 'local> HostRuntime for JniHost<'a, 'local> {
    type Object = JObject<'local>;
    type Class = GlobalRef;

    fn is_null(&self, object: &JObject<'local>) -> bool {
        object.is_null()
    }

    fn new_string(&mut self, text: &str) -> BridgeResult<JObject<'local>> {
        self.env
            .new_string(text)
            .map(JObject::from)
            .map_err(|e| self.settle(e))
    }

    fn string_bytes(&mut self, string: &JObject<'local>) -> BridgeResult<Vec<u8>> {
        let string: &JString<'local> = string.into();
        match self.env.get_string(string) {
            Ok(chars) => Ok(chars.to_bytes().to_vec()),
            Err(e) => Err(self.settle(e)),
        }
    }

    fn box_int(&mut self, value: i32) -> BridgeResult<JObject<'local>> {
        self.env
            .new_object("java/lang/Integer", "(I)V", &[JValue::Int(value)])
            .map_err(|e| self.settle(e))
    }

    fn is_instance_of(&mut self, object: &JObject<'local>, class_name: &str) -> BridgeResult<bool> {
        self.env
            .is_instance_of(object, class_name)
            .map_err(|e| self.settle(e))
    }

    fn new_object_array(&mut self, length: i32, element_class: &str) -> BridgeResult<JObject<'local>> {
        self.env
            .new_object_array(length, element_class, JObject::null())
            .map(JObject::from)
            .map_err(|e| self.settle(e))
    }

    fn array_length(&mut self, array: &JObject<'local>) -> BridgeResult<i32> {
        let array: &JObjectArray<'local> = array.into();
        self.env
            .get_array_length(array)
            .map_err(|e| self.settle(e))
    }

    fn array_class_name(&mut self, array: &JObject<'local>) -> BridgeResult<String> {
        let class = self
            .env
            .get_object_class(array)
            .map_err(|e| self.settle(e))?;
        let class = self.env.auto_local(class);
        let name = self
            .env
            .call_method(&class, "getName", "()Ljava/lang/String;", &[])
            .and_then(|value| value.l())
            .map_err(|e| self.settle(e))?;
        let name = self.env.auto_local(JString::from(name));
        let name: String = match self.env.get_string(&name) {
            Ok(chars) => chars.into(),
            Err(e) => return Err(self.settle(e)),
        };

        // Class.getName spells arrays with dots: [Ljava.lang.String;
        Ok(name.replace('.', "/"))
    }

    fn set_array_element(
        &mut self,
        array: &JObject<'local>,
        index: i32,
        value: &JObject<'local>,
    ) -> BridgeResult<()> {
        let array: &JObjectArray<'local> = array.into();
        self.env
            .set_object_array_element(array, index, value)
            .map_err(|e| self.settle(e))
    }

    fn array_element(&mut self, array: &JObject<'local>, index: i32) -> BridgeResult<JObject<'local>> {
        let array: &JObjectArray<'local> = array.into();
        self.env
            .get_object_array_element(array, index)
            .map_err(|e| self.settle(e))
    }

    fn release(&mut self, object: JObject<'local>) {
        // Only fails for a reference this frame does not own
        let _ = self.env.delete_local_ref(object);
    }

    fn find_class(&mut self, name: &str) -> BridgeResult<GlobalRef> {
        let class = match self.env.find_class(name) {
            Ok(class) => class,
            Err(e) => {
                let reason = self.settle(e).to_string();
                return Err(BridgeError::ClassResolution {
                    name: name.to_string(),
                    reason,
                });
            }
        };
        let class = self.env.auto_local(class);
        self.env.new_global_ref(&class).map_err(|e| self.settle(e))
    }

    fn class_cache(&self) -> &ClassCache<GlobalRef> {
        &JNI_CLASSES
    }

    fn alloc_object(&mut self, class: &GlobalRef) -> BridgeResult<JObject<'local>> {
        let local = self
            .env
            .new_local_ref(class)
            .map_err(|e| self.settle(e))?;
        let class = self.env.auto_local(JClass::from(local));
        self.env
            .alloc_object(&class)
            .map_err(|e| self.settle(e))
    }

    fn set_field(
        &mut self,
        object: &JObject<'local>,
        name: &str,
        signature: &str,
        value: HostValue<&JObject<'local>>,
    ) -> BridgeResult<()> {
        self.env
            .set_field(object, name, signature, to_jvalue(value))
            .map_err(|e| self.settle(e))
    }

    fn field(
        &mut self,
        object: &JObject<'local>,
        name: &str,
        signature: &str,
    ) -> BridgeResult<HostValue<JObject<'local>>> {
        self.env
            .get_field(object, name, signature)
            .map(from_jvalue)
            .map_err(|e| self.settle(e))
    }

    fn call_method(
        &mut self,
        object: &JObject<'local>,
        name: &str,
        signature: &str,
        args: &[HostValue<&JObject<'local>>],
    ) -> BridgeResult<HostValue<JObject<'local>>> {
        let args: Vec<JValue<'local, '_>> = args.iter().map(|arg| to_jvalue(*arg)).collect();
        self.env
            .call_method(object, name, signature, &args)
            .map(from_jvalue)
            .map_err(|e| self.settle(e))
    }
}
