//! Runtime values.
//!
//! A [`Value`] is either immediate (`Nil`, `Bool`, `Number`) or a handle to an
//! object owned by the VM's [`Heap`](crate::object::Heap). Language-level
//! equality and rendering need the heap and live there
//! ([`Heap::values_equal`](crate::object::Heap::values_equal),
//! [`Heap::display`](crate::object::Heap::display)).

use crate::object::ObjRef;

/// Tagged runtime value.
///
/// The derived `PartialEq` compares object handles by identity. The `==`
/// operator of the language compares strings by content through
/// [`Heap::values_equal`](crate::object::Heap::values_equal).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Nil,
    /// Boolean.
    Bool(bool),
    /// IEEE-754 double.
    Number(f64),
    /// Non-owning handle to a heap object.
    Obj(ObjRef),
}

impl Value {
    /// `nil` and `false` are falsey, everything else is truthy.
    #[must_use]
    pub const fn is_falsey(self) -> bool {
        matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Boolean payload, if any.
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Numeric payload, if any.
    #[must_use]
    pub const fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Object handle, if any.
    #[must_use]
    pub const fn as_obj(self) -> Option<ObjRef> {
        match self {
            Self::Obj(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, logged with runtime errors.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Obj(_) => "object",
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Self::Number(v) } }
impl From<ObjRef> for Value { fn from(v: ObjRef) -> Self { Self::Obj(v) } }
