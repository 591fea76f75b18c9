//! Object construction - native data into host class instances
//!
//! Classes are described statically by [`ClassDescriptor`] and resolved at
//! most once per library lifetime through a [`ClassCache`]. After
//! construction the native side only reads back through host accessors.

use super::array::{build_host_array, read_host_array, ElementKind, Sequence};
use super::codec::{decode_text, encode_text};
use super::value::{HostValue, ValueKind};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::HostRuntime;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// Field shapes the bridge knows how to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Int,
    TextArray,
    IntArray,
}

impl FieldKind {
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Text => ValueKind::Text.signature(),
            Self::Int => ValueKind::Int.signature(),
            Self::TextArray => ElementKind::Text.array_class(),
            Self::IntArray => ElementKind::Int.array_class(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    /// Name of the Kotlin-generated getter, `message` -> `getMessage`
    pub fn accessor(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => format!("get{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "get".to_string(),
        }
    }
}

/// Compile-time shape of a host class the native side instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Internal name, e.g. `RustyClass` or `com/example/Foo`
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl ClassDescriptor {
    pub const fn new(name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Native value destined for a host field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Int(i32),
    Sequence(Sequence),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Int(_) => FieldKind::Int,
            Self::Sequence(sequence) => match sequence.kind() {
                ElementKind::Text => FieldKind::TextArray,
                ElementKind::Int => FieldKind::IntArray,
            },
        }
    }
}

/// Write-once class lookup table.
///
/// Each class name gets its own one-time-initialization cell; once a cell
/// holds a class it is never replaced. Failed lookups leave the cell empty.
pub struct ClassCache<C> {
    slots: DashMap<&'static str, Arc<OnceCell<C>>>,
}

impl<C> Default for ClassCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ClassCache<C> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Cell for `name`, created empty on first sight
    pub fn cell(&self, name: &'static str) -> Arc<OnceCell<C>> {
        self.slots.entry(name).or_default().clone()
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map(|cell| cell.value().get().is_some())
            .unwrap_or(false)
    }

    /// Number of classes resolved so far
    pub fn resolved(&self) -> usize {
        self.slots.iter().filter(|cell| cell.value().get().is_some()).count()
    }
}

/// Resolve a descriptor's class, hitting the host at most once per class
pub fn resolve_class<H: HostRuntime>(host: &mut H, descriptor: &ClassDescriptor) -> BridgeResult<H::Class> {
    let cell = host.class_cache().cell(descriptor.name);

    cell.get_or_try_init(|| {
        debug!(class = descriptor.name, "Resolving host class");
        host.find_class(descriptor.name).map_err(|e| match e {
            BridgeError::ClassResolution { .. } => e,
            other => BridgeError::ClassResolution {
                name: descriptor.name.to_string(),
                reason: other.to_string(),
            },
        })
    })
    .cloned()
}

/// Instantiate `descriptor` and bind each `(field, value)` pair.
///
/// All values are checked against the descriptor before anything is
/// allocated, so a binding error never leaves a half-built object behind.
pub fn construct<H: HostRuntime>(
    host: &mut H,
    descriptor: &ClassDescriptor,
    values: &[(&str, FieldValue)],
) -> BridgeResult<H::Object> {
    for (name, value) in values {
        let field = descriptor
            .field(name)
            .ok_or_else(|| BridgeError::field(descriptor.name, name, "not declared by the class"))?;
        if field.kind != value.kind() {
            return Err(BridgeError::field(
                descriptor.name,
                name,
                format!("expected {:?}, got {:?}", field.kind, value.kind()),
            ));
        }
    }

    let class = resolve_class(host, descriptor)?;
    let object = host.alloc_object(&class)?;

    for (name, value) in values {
        let signature = value.kind().signature();
        let lifted = match value {
            FieldValue::Text(text) => HostValue::Object(encode_text(host, text)?),
            FieldValue::Int(v) => HostValue::Int(*v),
            FieldValue::Sequence(sequence) => HostValue::Object(build_host_array(host, sequence)?),
        };

        let bound = host.set_field(&object, name, signature, lifted.borrowed());
        if let HostValue::Object(handle) = lifted {
            host.release(handle);
        }
        bound.map_err(|e| match e {
            BridgeError::FieldBinding { .. } => e,
            other => BridgeError::field(descriptor.name, name, other.to_string()),
        })?;
    }

    debug!(
        class = descriptor.name,
        fields = values.len(),
        "Host object constructed"
    );

    Ok(object)
}

/// Read a field through the class's own getter; dispatch stays with the host
pub fn call_accessor<H: HostRuntime>(
    host: &mut H,
    object: &H::Object,
    field: &FieldDescriptor,
) -> BridgeResult<FieldValue> {
    let signature = format!("(){}", field.kind.signature());
    let returned = host.call_method(object, &field.accessor(), &signature, &[])?;

    let value = match field.kind {
        FieldKind::Int => FieldValue::Int(returned.int()?),
        FieldKind::Text => FieldValue::Text(consume(host, returned.object()?, decode_text)?),
        FieldKind::TextArray => FieldValue::Sequence(consume(host, returned.object()?, |host, array| {
            read_host_array(host, array, ElementKind::Text)
        })?),
        FieldKind::IntArray => FieldValue::Sequence(consume(host, returned.object()?, |host, array| {
            read_host_array(host, array, ElementKind::Int)
        })?),
    };

    Ok(value)
}

/// Invoke a no-argument method returning `String`
pub fn call_text_method<H: HostRuntime>(
    host: &mut H,
    object: &H::Object,
    method: &str,
) -> BridgeResult<String> {
    let returned = host
        .call_method(object, method, "()Ljava/lang/String;", &[])?
        .object()?;
    consume(host, returned, decode_text)
}

/// Read a returned handle, then give it back to the host
fn consume<H: HostRuntime, T>(
    host: &mut H,
    handle: H::Object,
    read: impl FnOnce(&mut H, &H::Object) -> BridgeResult<T>,
) -> BridgeResult<T> {
    let outcome = read(host, &handle);
    host.release(handle);
    outcome
}
