//! JNI symbols for the entry points declared in `host/kotlin/Rust.kt`
//!
//! Each export wraps a live `JNIEnv` in a [`JniHost`], runs its entry point
//! under [`run_entry`], and converts a [`Fatal`] into `FatalError`.
//! Symbol names here must stay in step with `ENTRY_POINTS`.

use super::{
    dir_reader_with_result, native_assertions, result_of_array_string, run_entry, rusty_array,
    rusty_array_ints, rusty_class, silly_debugger, Fatal, CLASSES,
};
use crate::config;
use crate::host::{HostRuntime, JniHost};
use crate::marshal::resolve_class;
use jni::objects::{JClass, JObject};
use jni::sys::{jint, jobject, jstring, JNI_ERR, JNI_VERSION_1_8};
use jni::{JNIEnv, JavaVM};
use std::ffi::c_void;
use tracing::{info, warn};

/// Hand the value back, or abort the VM
fn finish<T>(env: &JNIEnv<'_>, outcome: Result<T, Fatal>) -> T {
    match outcome {
        Ok(value) => value,
        Err(fatal) => env.fatal_error(fatal.to_string()),
    }
}

/// Run an object-returning entry point against the live VM
fn export_object<'local>(
    env: &mut JNIEnv<'local>,
    entry: &'static str,
    body: impl FnOnce(&mut JniHost<'_, 'local>) -> crate::errors::BridgeResult<JObject<'local>>,
) -> jobject {
    let outcome = run_entry(entry, || {
        let mut host = JniHost::new(&mut *env);
        body(&mut host).map(JObject::into_raw)
    });
    finish(env, outcome)
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    let outcome = run_entry("JNI_OnLoad", || {
        let mut env = vm.get_env()?;
        let mut host = JniHost::new(&mut env);
        for class in CLASSES {
            if let Err(err) = resolve_class(&mut host, class) {
                // The class may live behind a loader we cannot see yet;
                // the first call that needs it resolves it again.
                warn!(class = class.name, error = %err, "Class not resolved at load");
            }
        }
        let resolved = host.class_cache().resolved();
        info!(resolved, "Native library loaded");
        Ok(())
    });

    match outcome {
        Ok(()) => JNI_VERSION_1_8,
        Err(_) => JNI_ERR,
    }
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_nativeAssertions<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    let outcome = run_entry("nativeAssertions", || {
        let mut host = JniHost::new(&mut env);
        native_assertions(&mut host)
    });
    finish(&env, outcome)
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_rustyClass<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jobject {
    export_object(&mut env, "rustyClass", |host| rusty_class(host))
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_rustyArray<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jobject {
    export_object(&mut env, "rustyArray", |host| rusty_array(host))
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_rustyArrayInts<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jobject {
    export_object(&mut env, "rustyArrayInts", |host| rusty_array_ints(host))
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_resultOfArrayString<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jobject {
    export_object(&mut env, "resultOfArrayString", |host| {
        result_of_array_string(host)
    })
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_dirReaderWithResult<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jobject {
    export_object(&mut env, "dirReaderWithResult", |host| {
        let path = config::global().dir_reader.path.clone();
        dir_reader_with_result(host, &path)
    })
}

#[no_mangle]
pub extern "system" fn Java_RustLibrary_sillyDebugger<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    export_object(&mut env, "sillyDebugger", |host| silly_debugger(host))
}
