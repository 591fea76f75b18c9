//! In-process managed heap
//!
//! A small stand-in for the JVM object model: UTF-16 strings handed out as
//! modified UTF-8, boxed integers, typed object arrays, instances whose fields
//! are bound by name and signature, and methods dispatched by name and
//! signature to managed bodies. `alloc_object` leaves fields at their zero
//! value, exactly like `AllocObject`.

use super::HostRuntime;
use crate::errors::{BridgeError, BridgeResult};
use crate::marshal::{ClassCache, HostValue};
use std::collections::HashMap;

/// Handle into a [`MemoryHost`] heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(usize);

impl ObjRef {
    pub const NULL: ObjRef = ObjRef(usize::MAX);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// Managed method body: `(host, this, args) -> result`
pub type MethodBody =
    fn(&mut MemoryHost, ObjRef, &[HostValue<ObjRef>]) -> BridgeResult<HostValue<ObjRef>>;

#[derive(Clone)]
enum Method {
    Getter { field: String, signature: String },
    Body(MethodBody),
}

#[derive(Debug, Clone)]
struct FieldDef {
    name: String,
    signature: String,
    /// Text assigned by the class's own initializer, if any
    default_text: Option<String>,
}

/// Declaration of a managed class
#[derive(Clone)]
pub struct ClassDef {
    name: String,
    fields: Vec<FieldDef>,
    methods: HashMap<(String, String), Method>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: HashMap::new(),
        }
    }

    pub fn field(mut self, name: &str, signature: &str) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            signature: signature.to_string(),
            default_text: None,
        });
        self
    }

    /// String field whose initializer assigns `default`
    pub fn text_field(mut self, name: &str, default: &str) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            signature: "Ljava/lang/String;".to_string(),
            default_text: Some(default.to_string()),
        });
        self
    }

    /// Kotlin-style getter for an already declared field
    pub fn getter(mut self, field: &str) -> Self {
        if let Some(def) = self.fields.iter().find(|f| f.name == field) {
            let mut chars = field.chars();
            let accessor = match chars.next() {
                Some(first) => format!("get{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => "get".to_string(),
            };
            let signature = def.signature.clone();
            self.methods.insert(
                (accessor, format!("(){}", signature)),
                Method::Getter {
                    field: field.to_string(),
                    signature,
                },
            );
        }
        self
    }

    pub fn method(mut self, name: &str, signature: &str, body: MethodBody) -> Self {
        self.methods
            .insert((name.to_string(), signature.to_string()), Method::Body(body));
        self
    }
}

#[derive(Debug, Clone)]
enum HeapObject {
    Str(Vec<u16>),
    Integer(i32),
    Array { class: String, slots: Vec<ObjRef> },
    Instance {
        class: usize,
        fields: HashMap<String, HostValue<ObjRef>>,
    },
}

const STRING_CLASS: &str = "java/lang/String";
const INTEGER_CLASS: &str = "java/lang/Integer";
const OBJECT_CLASS: &str = "java/lang/Object";

pub struct MemoryHost {
    heap: Vec<HeapObject>,
    classes: Vec<ClassDef>,
    cache: ClassCache<usize>,
    lookups: usize,
    released: usize,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Heap with only the `java/lang` classes the bridge relies on
    pub fn new() -> Self {
        let mut host = Self {
            heap: Vec::new(),
            classes: Vec::new(),
            cache: ClassCache::new(),
            lookups: 0,
            released: 0,
        };

        host.declare(ClassDef::new(OBJECT_CLASS));
        host.declare(ClassDef::new(STRING_CLASS));
        host.declare(ClassDef::new(INTEGER_CLASS).method("intValue", "()I", |host, this, _| {
            match host.get(this)? {
                HeapObject::Integer(value) => Ok(HostValue::Int(*value)),
                _ => Err(BridgeError::Host("intValue on a non-Integer".to_string())),
            }
        }));
        host
    }

    /// Heap with the classes declared in `host/kotlin/Rust.kt`
    pub fn with_fixture_classes() -> Self {
        let mut host = Self::new();
        host.declare(
            ClassDef::new("RustyClass")
                .text_field("message", "FROM_KOTLIN")
                .getter("message"),
        );
        for envelope in ["ResultOfArrayString", "DirReaderWithResult"] {
            host.declare(
                ClassDef::new(envelope)
                    .field("successData", "[Ljava/lang/String;")
                    .field("failureData", "[Ljava/lang/String;")
                    .getter("successData")
                    .getter("failureData"),
            );
        }
        host
    }

    pub fn declare(&mut self, class: ClassDef) {
        match self.classes.iter().position(|c| c.name == class.name) {
            Some(index) => self.classes[index] = class,
            None => self.classes.push(class),
        }
    }

    /// Number of uncached class lookups served so far
    pub fn class_lookups(&self) -> usize {
        self.lookups
    }

    /// Handles returned through `release`. The heap is never collected, so
    /// this is what tests check local handle hygiene against.
    pub fn released(&self) -> usize {
        self.released
    }

    pub fn live_objects(&self) -> usize {
        self.heap.len()
    }

    /// Build a string from raw UTF-16 units, lone surrogates included
    pub fn new_string_from_units(&mut self, units: &[u16]) -> ObjRef {
        self.alloc(HeapObject::Str(units.to_vec()))
    }

    /// Allocate and run the class's field initializers, as a host-side
    /// constructor call would
    pub fn new_instance(&mut self, class_name: &str) -> BridgeResult<ObjRef> {
        let class = self.class_id(class_name)?;
        let object = self.alloc_object(&class)?;

        let defaults: Vec<(String, String)> = self.classes[class]
            .fields
            .iter()
            .filter_map(|f| f.default_text.clone().map(|text| (f.name.clone(), text)))
            .collect();
        for (field, text) in defaults {
            let value = self.new_string(&text)?;
            self.set_field(&object, &field, "Ljava/lang/String;", HostValue::Object(&value))?;
        }

        Ok(object)
    }

    fn alloc(&mut self, object: HeapObject) -> ObjRef {
        self.heap.push(object);
        ObjRef(self.heap.len() - 1)
    }

    fn get(&self, object: ObjRef) -> BridgeResult<&HeapObject> {
        if object.is_null() {
            return Err(BridgeError::Host("NullPointerException".to_string()));
        }
        self.heap
            .get(object.0)
            .ok_or_else(|| BridgeError::Host(format!("dangling handle {:?}", object)))
    }

    fn class_id(&self, name: &str) -> BridgeResult<usize> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| BridgeError::ClassResolution {
                name: name.to_string(),
                reason: "NoClassDefFoundError".to_string(),
            })
    }

    fn class_name_of(&self, object: ObjRef) -> BridgeResult<String> {
        let name = match self.get(object)? {
            HeapObject::Str(_) => STRING_CLASS.to_string(),
            HeapObject::Integer(_) => INTEGER_CLASS.to_string(),
            HeapObject::Array { class, .. } => class.clone(),
            HeapObject::Instance { class, .. } => self.classes[*class].name.clone(),
        };
        Ok(name)
    }

    /// Whether `value` may be stored where `signature` is declared
    fn fits(&self, value: &HostValue<ObjRef>, signature: &str) -> bool {
        match (value, signature) {
            (HostValue::Byte(_), "B")
            | (HostValue::Short(_), "S")
            | (HostValue::Int(_), "I")
            | (HostValue::Long(_), "J")
            | (HostValue::Float(_), "F")
            | (HostValue::Double(_), "D")
            | (HostValue::Boolean(_), "Z")
            | (HostValue::Char(_), "C") => true,
            (HostValue::Object(object), sig) if sig.starts_with('L') || sig.starts_with('[') => {
                if object.is_null() {
                    return true;
                }
                let class = if sig.starts_with('L') {
                    sig.trim_start_matches('L').trim_end_matches(';')
                } else {
                    sig
                };
                self.instance_of(*object, class)
            }
            _ => false,
        }
    }

    fn instance_of(&self, object: ObjRef, class_name: &str) -> bool {
        if object.is_null() {
            return true;
        }
        match self.class_name_of(object) {
            Ok(name) => name == class_name || class_name == OBJECT_CLASS,
            Err(_) => false,
        }
    }

    fn field_def(&self, object: ObjRef, name: &str) -> BridgeResult<(String, FieldDef)> {
        match self.get(object)? {
            HeapObject::Instance { class, .. } => {
                let def = &self.classes[*class];
                def.fields
                    .iter()
                    .find(|f| f.name == name)
                    .map(|f| (def.name.clone(), f.clone()))
                    .ok_or_else(|| BridgeError::field(&def.name, name, "NoSuchFieldError"))
            }
            _ => Err(BridgeError::Host(format!(
                "field `{}` requested on a non-instance",
                name
            ))),
        }
    }

    fn zero_value(signature: &str) -> HostValue<ObjRef> {
        match signature {
            "B" => HostValue::Byte(0),
            "S" => HostValue::Short(0),
            "I" => HostValue::Int(0),
            "J" => HostValue::Long(0),
            "F" => HostValue::Float(0.0),
            "D" => HostValue::Double(0.0),
            "Z" => HostValue::Boolean(0),
            "C" => HostValue::Char(0),
            _ => HostValue::Object(ObjRef::NULL),
        }
    }
}

/// Encode UTF-16 units as the JVM's modified UTF-8: NUL takes two bytes and
/// each surrogate is encoded on its own
fn modified_utf8(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len());
    for &unit in units {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn owned(value: HostValue<&ObjRef>) -> HostValue<ObjRef> {
    match value {
        HostValue::Byte(v) => HostValue::Byte(v),
        HostValue::Short(v) => HostValue::Short(v),
        HostValue::Int(v) => HostValue::Int(v),
        HostValue::Long(v) => HostValue::Long(v),
        HostValue::Float(v) => HostValue::Float(v),
        HostValue::Double(v) => HostValue::Double(v),
        HostValue::Boolean(v) => HostValue::Boolean(v),
        HostValue::Char(v) => HostValue::Char(v),
        HostValue::Void => HostValue::Void,
        HostValue::Object(o) => HostValue::Object(*o),
    }
}

impl HostRuntime for MemoryHost {
    type Object = ObjRef;
    type Class = usize;

    fn is_null(&self, object: &ObjRef) -> bool {
        object.is_null()
    }

    fn new_string(&mut self, text: &str) -> BridgeResult<ObjRef> {
        Ok(self.alloc(HeapObject::Str(text.encode_utf16().collect())))
    }

    fn string_bytes(&mut self, string: &ObjRef) -> BridgeResult<Vec<u8>> {
        match self.get(*string)? {
            HeapObject::Str(units) => Ok(modified_utf8(units)),
            _ => Err(BridgeError::mismatch(STRING_CLASS, self.class_name_of(*string)?)),
        }
    }

    fn box_int(&mut self, value: i32) -> BridgeResult<ObjRef> {
        Ok(self.alloc(HeapObject::Integer(value)))
    }

    fn is_instance_of(&mut self, object: &ObjRef, class_name: &str) -> BridgeResult<bool> {
        self.class_id(class_name)?;
        Ok(self.instance_of(*object, class_name))
    }

    fn new_object_array(&mut self, length: i32, element_class: &str) -> BridgeResult<ObjRef> {
        if length < 0 {
            return Err(BridgeError::Host(format!(
                "NegativeArraySizeException: {}",
                length
            )));
        }
        self.class_id(element_class)?;
        Ok(self.alloc(HeapObject::Array {
            class: format!("[L{};", element_class),
            slots: vec![ObjRef::NULL; length as usize],
        }))
    }

    fn array_length(&mut self, array: &ObjRef) -> BridgeResult<i32> {
        match self.get(*array)? {
            HeapObject::Array { slots, .. } => Ok(slots.len() as i32),
            _ => Err(BridgeError::Host("array length of a non-array".to_string())),
        }
    }

    fn array_class_name(&mut self, array: &ObjRef) -> BridgeResult<String> {
        self.class_name_of(*array)
    }

    fn set_array_element(&mut self, array: &ObjRef, index: i32, value: &ObjRef) -> BridgeResult<()> {
        let element_class = match self.get(*array)? {
            HeapObject::Array { class, .. } => class
                .trim_start_matches("[L")
                .trim_end_matches(';')
                .to_string(),
            _ => return Err(BridgeError::Host("store into a non-array".to_string())),
        };
        if !self.instance_of(*value, &element_class) {
            return Err(BridgeError::Host(format!(
                "ArrayStoreException: {}",
                self.class_name_of(*value)?
            )));
        }

        match self.heap.get_mut(array.0) {
            Some(HeapObject::Array { slots, .. }) => {
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| slots.get_mut(i))
                    .ok_or_else(|| {
                        BridgeError::Host(format!("ArrayIndexOutOfBoundsException: {}", index))
                    })?;
                *slot = *value;
                Ok(())
            }
            _ => Err(BridgeError::Host("store into a non-array".to_string())),
        }
    }

    fn array_element(&mut self, array: &ObjRef, index: i32) -> BridgeResult<ObjRef> {
        match self.get(*array)? {
            HeapObject::Array { slots, .. } => usize::try_from(index)
                .ok()
                .and_then(|i| slots.get(i))
                .copied()
                .ok_or_else(|| {
                    BridgeError::Host(format!("ArrayIndexOutOfBoundsException: {}", index))
                }),
            _ => Err(BridgeError::Host("load from a non-array".to_string())),
        }
    }

    fn release(&mut self, _object: ObjRef) {
        self.released += 1;
    }

    fn find_class(&mut self, name: &str) -> BridgeResult<usize> {
        self.lookups += 1;
        self.class_id(name)
    }

    fn class_cache(&self) -> &ClassCache<usize> {
        &self.cache
    }

    fn alloc_object(&mut self, class: &usize) -> BridgeResult<ObjRef> {
        let def = self
            .classes
            .get(*class)
            .ok_or_else(|| BridgeError::Host(format!("unknown class id {}", class)))?;
        let fields = def
            .fields
            .iter()
            .map(|f| (f.name.clone(), Self::zero_value(&f.signature)))
            .collect();
        Ok(self.alloc(HeapObject::Instance {
            class: *class,
            fields,
        }))
    }

    fn set_field(
        &mut self,
        object: &ObjRef,
        name: &str,
        signature: &str,
        value: HostValue<&ObjRef>,
    ) -> BridgeResult<()> {
        let (class, def) = self.field_def(*object, name)?;
        if def.signature != signature {
            return Err(BridgeError::field(
                &class,
                name,
                format!("declared as {}, bound as {}", def.signature, signature),
            ));
        }
        let value = owned(value);
        if !self.fits(&value, signature) {
            return Err(BridgeError::field(
                &class,
                name,
                format!("{} value does not fit {}", value.kind_name(), signature),
            ));
        }

        match self.heap.get_mut(object.0) {
            Some(HeapObject::Instance { fields, .. }) => {
                fields.insert(name.to_string(), value);
                Ok(())
            }
            _ => Err(BridgeError::field(&class, name, "object is not an instance")),
        }
    }

    fn field(&mut self, object: &ObjRef, name: &str, signature: &str) -> BridgeResult<HostValue<ObjRef>> {
        let (class, def) = self.field_def(*object, name)?;
        if def.signature != signature {
            return Err(BridgeError::field(
                &class,
                name,
                format!("declared as {}, read as {}", def.signature, signature),
            ));
        }
        match self.get(*object)? {
            HeapObject::Instance { fields, .. } => Ok(fields
                .get(name)
                .copied()
                .unwrap_or_else(|| Self::zero_value(signature))),
            _ => Err(BridgeError::field(&class, name, "object is not an instance")),
        }
    }

    fn call_method(
        &mut self,
        object: &ObjRef,
        name: &str,
        signature: &str,
        args: &[HostValue<&ObjRef>],
    ) -> BridgeResult<HostValue<ObjRef>> {
        let class = self.class_name_of(*object)?;
        let class_id = self.class_id(&class).ok();
        let method = class_id
            .and_then(|id| {
                self.classes[id]
                    .methods
                    .get(&(name.to_string(), signature.to_string()))
            })
            .cloned()
            .ok_or_else(|| {
                BridgeError::Host(format!("NoSuchMethodError: {}.{}{}", class, name, signature))
            })?;

        match method {
            Method::Getter { field, signature } => self.field(object, &field, &signature),
            Method::Body(body) => {
                let args: Vec<HostValue<ObjRef>> = args.iter().map(|a| owned(*a)).collect();
                body(self, *object, &args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_utf8_encoding() {
        assert_eq!(modified_utf8(&[0x41]), vec![0x41]);
        assert_eq!(modified_utf8(&[0x0000]), vec![0xC0, 0x80]);
        assert_eq!(modified_utf8(&[0x00E9]), vec![0xC3, 0xA9]);
        // each half of a pair is encoded separately
        assert_eq!(
            modified_utf8(&[0xD83D, 0xDE00]),
            vec![0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]
        );
    }

    #[test]
    fn test_alloc_object_zeroes_fields() {
        let mut host = MemoryHost::with_fixture_classes();
        let class = host.find_class("RustyClass").unwrap();
        let object = host.alloc_object(&class).unwrap();
        let message = host.field(&object, "message", "Ljava/lang/String;").unwrap();
        assert_eq!(message, HostValue::Object(ObjRef::NULL));
    }

    #[test]
    fn test_array_store_is_type_checked() {
        let mut host = MemoryHost::new();
        let array = host.new_object_array(1, "java/lang/String").unwrap();
        let boxed = host.box_int(1).unwrap();
        assert!(host.set_array_element(&array, 0, &boxed).is_err());
        assert!(host.set_array_element(&array, 1, &ObjRef::NULL).is_err());
    }

    #[test]
    fn test_unknown_method() {
        let mut host = MemoryHost::new();
        let string = host.new_string("x").unwrap();
        let err = host.call_method(&string, "nope", "()V", &[]).unwrap_err();
        assert!(err.to_string().contains("NoSuchMethodError"));
    }
}
