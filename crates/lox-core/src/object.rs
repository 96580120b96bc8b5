//! Heap objects and the registry that owns them.
//!
//! Objects are created through the [`Heap`] and live until
//! [`Heap::release_all`]; there is no per-object free. Values hold
//! [`ObjRef`] handles (registry indices), never the objects themselves.
//! No object variant references another object, so the registry cannot hold
//! cycles and a single teardown walk frees everything.

use core::fmt;
use std::borrow::Cow;

use crate::memory::{self, GrowableBuffer};
use crate::value::Value;

/// Handle to an object owned by a [`Heap`].
///
/// Handles issued before [`Heap::release_all`] must not be used afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(usize);

impl ObjRef {
    /// Registry slot of the object.
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

/// Object variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    /// Immutable byte string.
    String,
}

/// Immutable string payload.
#[derive(Debug)]
pub struct StringObject {
    chars: Vec<u8>,
}

impl StringObject {
    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.chars.len() }

    /// Whether the string has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.chars.is_empty() }

    /// Raw content.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.chars }

    /// Content as text (invalid UTF-8 replaced).
    #[must_use]
    pub fn to_str_lossy(&self) -> Cow<'_, str> { String::from_utf8_lossy(&self.chars) }
}

/// Heap-allocated object.
#[derive(Debug)]
pub enum Obj {
    /// String object.
    String(StringObject),
}

impl Obj {
    /// Variant tag.
    #[must_use]
    pub const fn kind(&self) -> ObjKind {
        match self {
            Self::String(_) => ObjKind::String,
        }
    }

    /// Free the owned payload, returning the number of bytes released.
    fn release_payload(&mut self) -> usize {
        match self {
            Self::String(s) => memory::free(&mut s.chars),
        }
    }
}

/// Outcome of [`Heap::release_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReleaseStats {
    /// Objects freed.
    pub objects: usize,
    /// Payload bytes freed.
    pub bytes: usize,
}

/// Registry owning every heap object of a VM.
#[derive(Debug, Default)]
pub struct Heap {
    objects: GrowableBuffer<Obj>,
}

impl Heap {
    /// Empty registry.
    #[must_use]
    pub const fn new() -> Self { Self { objects: GrowableBuffer::new() } }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize { self.objects.len() }

    /// Whether no object is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.objects.is_empty() }

    /// New string object holding a copy of `bytes`.
    pub fn copy_string(&mut self, bytes: &[u8]) -> ObjRef {
        let mut chars = memory::allocate(bytes.len());
        chars.extend_from_slice(bytes);
        self.take_string(chars)
    }

    /// New string object adopting `chars` without copying.
    pub fn take_string(&mut self, chars: Vec<u8>) -> ObjRef {
        self.register(Obj::String(StringObject { chars }))
    }

    /// New string holding the bytes of `a` followed by the bytes of `b`.
    ///
    /// Neither source is touched. `None` if either handle is not a live string.
    pub fn concatenate(&mut self, a: ObjRef, b: ObjRef) -> Option<ObjRef> {
        let chars = {
            let left = self.as_string(a)?;
            let right = self.as_string(b)?;
            let mut chars = memory::allocate(left.len() + right.len());
            chars.extend_from_slice(left.as_bytes());
            chars.extend_from_slice(right.as_bytes());
            chars
        };
        Some(self.take_string(chars))
    }

    /// Object behind `r`, if live.
    #[must_use]
    pub fn get(&self, r: ObjRef) -> Option<&Obj> { self.objects.get(r.0) }

    /// String behind `r`, if `r` is a live string.
    #[must_use]
    pub fn as_string(&self, r: ObjRef) -> Option<&StringObject> {
        match self.get(r)? {
            Obj::String(s) => Some(s),
        }
    }

    /// Whether `value` refers to a live string.
    #[must_use]
    pub fn is_string(&self, value: Value) -> bool {
        value.as_obj().and_then(|r| self.as_string(r)).is_some()
    }

    /// Language equality. Strings compare by content.
    #[must_use]
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            #[allow(clippy::float_cmp)]
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Obj(x), Value::Obj(y)) => x == y || self.objects_equal(x, y),
            _ => false,
        }
    }

    fn objects_equal(&self, a: ObjRef, b: ObjRef) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(Obj::String(x)), Some(Obj::String(y))) => x.as_bytes() == y.as_bytes(),
            _ => false,
        }
    }

    /// Printable form of `value`.
    #[must_use]
    pub const fn display(&self, value: Value) -> ValueDisplay<'_> {
        ValueDisplay { heap: self, value }
    }

    /// Free every object. Called once at VM teardown; a second call frees nothing.
    pub fn release_all(&mut self) -> ReleaseStats {
        let mut stats = ReleaseStats::default();
        for obj in self.objects.as_mut_slice() {
            stats.bytes += obj.release_payload();
            stats.objects += 1;
        }
        self.objects.release();
        tracing::debug!(objects = stats.objects, bytes = stats.bytes, "heap released");
        stats
    }

    fn register(&mut self, obj: Obj) -> ObjRef {
        let r = ObjRef(self.objects.len());
        self.objects.push(obj);
        r
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        if !self.objects.is_empty() {
            self.release_all();
        }
    }
}

/// [`fmt::Display`] adapter returned by [`Heap::display`].
#[derive(Clone, Copy)]
pub struct ValueDisplay<'a> {
    heap: &'a Heap,
    value: Value,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Obj(r) => match self.heap.get(r) {
                Some(Obj::String(s)) => f.write_str(&s.to_str_lossy()),
                None => write!(f, "<dangling #{}>", r.index()),
            },
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
