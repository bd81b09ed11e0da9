//! Shared-ownership handles for matrix, field and mesh payloads.
//!
//! A [`Handle`] wraps exactly one payload behind an `Arc`. Cloning a handle
//! shares the payload; it never copies it. Mutation goes through
//! [`Handle::make_mut`], which copies the payload first whenever another
//! holder can still observe it, so a published handle is never changed under
//! a reader's feet.
//!
//! "No data" is spelled `Option<Handle<T>>`, never a dangling handle.
//!
//! Ports carry type-erased [`AnyHandle`]s, the way graph wires carry opaque
//! values, and modules downcast them back to typed handles.

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A payload type that can travel through ports.
///
/// Implement this for matrices, fields, meshes and any other data passed
/// between modules.
pub trait Payload: Any + Send + Sync + fmt::Debug {
    /// Human-readable type name used in port descriptors and errors.
    const TYPE_NAME: &'static str;
}

/// Runtime identifier for a payload type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadType {
    /// Rust's TypeId for runtime checking.
    pub type_id: TypeId,
    /// Human-readable name.
    pub name: &'static str,
}

impl PayloadType {
    /// Returns the payload type of `T`.
    pub fn of<T: Payload>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::TYPE_NAME,
        }
    }
}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadType({})", self.name)
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Shared, copy-on-write reference to one payload.
pub struct Handle<T>(Arc<T>);

impl<T> Handle<T> {
    /// Wraps a payload in a new handle.
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns true if both handles point at the same payload.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns true if no other handle shares this payload.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// Number of holders currently sharing the payload.
    pub fn holder_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Identity of the payload allocation, stable for the payload's lifetime.
    pub fn stable_id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T: Clone> Handle<T> {
    /// Returns a handle to an independent copy of the payload.
    pub fn deep_clone(&self) -> Self {
        Self::new(T::clone(&self.0))
    }

    /// Mutable access, copying the payload first if it is shared.
    pub fn make_mut(&mut self) -> &mut T {
        Arc::make_mut(&mut self.0)
    }

    /// Takes the payload out, copying it if other holders remain.
    pub fn into_inner(self) -> T {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| T::clone(&shared))
    }
}

impl<T: Payload> Handle<T> {
    /// Erases the payload type for transport through a port.
    pub fn erase(self) -> AnyHandle {
        AnyHandle {
            payload_type: PayloadType::of::<T>(),
            inner: self.0,
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&*self.0).finish()
    }
}

impl<T> From<T> for Handle<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Serialize> Serialize for Handle<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        T::serialize(&self.0, serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Handle<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Handle::new)
    }
}

/// Type-erased handle carried by ports.
#[derive(Clone)]
pub struct AnyHandle {
    payload_type: PayloadType,
    inner: Arc<dyn Any + Send + Sync>,
}

impl AnyHandle {
    /// The payload type behind this handle.
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Returns true if the payload is a `T`.
    pub fn is<T: Payload>(&self) -> bool {
        self.payload_type.type_id == TypeId::of::<T>()
    }

    /// Recovers the typed handle. The payload stays shared.
    pub fn downcast<T: Payload>(&self) -> Option<Handle<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok().map(Handle)
    }

    /// Identity of the payload allocation.
    ///
    /// Only meaningful while the payload is alive; a freed allocation's
    /// address may be reused by a later payload.
    pub fn stable_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// Returns true if both handles share the same payload.
    pub fn ptr_eq(&self, other: &AnyHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for AnyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyHandle")
            .field("payload_type", &self.payload_type)
            .finish_non_exhaustive()
    }
}

impl<T: Payload> From<Handle<T>> for AnyHandle {
    fn from(handle: Handle<T>) -> Self {
        handle.erase()
    }
}
