//! Host runtime seam
//!
//! The marshalling core never talks to JNI directly. It drives a
//! [`HostRuntime`], which exposes the handful of object-model operations a
//! managed runtime offers to native code.
//!
//! Architecture:
//! - `jvm.rs` - the live JVM, through a borrowed `JNIEnv`
//! - `memory.rs` - an in-process managed heap with the same observable semantics

mod jvm;
mod memory;

pub use jvm::{JniHost, JNI_CLASSES};
pub use memory::{ClassDef, MemoryHost, MethodBody, ObjRef};

use crate::errors::BridgeResult;
use crate::marshal::{ClassCache, HostValue};

/// Object-model operations the host runtime provides to native code.
///
/// Handles returned by these methods belong to the host. Implementations must
/// not keep them beyond the current call.
pub trait HostRuntime {
    /// Handle to a host object (strings and arrays included)
    type Object;
    /// Resolved class, cheap to clone and valid for the library's lifetime
    type Class: Clone;

    fn is_null(&self, object: &Self::Object) -> bool;

    /// Allocate a host string holding `text`
    fn new_string(&mut self, text: &str) -> BridgeResult<Self::Object>;

    /// Contents of a host string in the JVM's modified UTF-8
    fn string_bytes(&mut self, string: &Self::Object) -> BridgeResult<Vec<u8>>;

    /// Box an `int` into a `java/lang/Integer`
    fn box_int(&mut self, value: i32) -> BridgeResult<Self::Object>;

    fn is_instance_of(&mut self, object: &Self::Object, class_name: &str) -> BridgeResult<bool>;

    /// Allocate an object array of `length` null slots
    fn new_object_array(&mut self, length: i32, element_class: &str) -> BridgeResult<Self::Object>;

    fn array_length(&mut self, array: &Self::Object) -> BridgeResult<i32>;

    /// Runtime class of an array in descriptor form, e.g. `[Ljava/lang/String;`
    fn array_class_name(&mut self, array: &Self::Object) -> BridgeResult<String>;

    fn set_array_element(
        &mut self,
        array: &Self::Object,
        index: i32,
        value: &Self::Object,
    ) -> BridgeResult<()>;

    fn array_element(&mut self, array: &Self::Object, index: i32) -> BridgeResult<Self::Object>;

    /// Hand back a handle the caller no longer needs. Long loops release as
    /// they go so a large array does not exhaust the host's local table.
    fn release(&mut self, object: Self::Object);

    /// Uncached class lookup; callers go through [`ClassCache`]
    fn find_class(&mut self, name: &str) -> BridgeResult<Self::Class>;

    fn class_cache(&self) -> &ClassCache<Self::Class>;

    /// Allocate an instance without running its constructor
    fn alloc_object(&mut self, class: &Self::Class) -> BridgeResult<Self::Object>;

    fn set_field(
        &mut self,
        object: &Self::Object,
        name: &str,
        signature: &str,
        value: HostValue<&Self::Object>,
    ) -> BridgeResult<()>;

    fn field(
        &mut self,
        object: &Self::Object,
        name: &str,
        signature: &str,
    ) -> BridgeResult<HostValue<Self::Object>>;

    /// Dispatch an instance method by name and signature
    fn call_method(
        &mut self,
        object: &Self::Object,
        name: &str,
        signature: &str,
        args: &[HostValue<&Self::Object>],
    ) -> BridgeResult<HostValue<Self::Object>>;
}
