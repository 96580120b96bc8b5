//! Operand stack.
//!
//! Fixed capacity, allocated once through the core allocator. Overflow and
//! underflow are runtime errors, not panics.

use core::fmt;

use lox_core::memory;
use lox_core::object::Heap;
use lox_core::value::Value;

use crate::error::RuntimeErrorKind;

/// Bounded LIFO of values.
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    max: usize,
}

impl Stack {
    /// Empty stack holding at most `max` values.
    #[must_use]
    pub fn new(max: usize) -> Self { Self { values: memory::allocate(max), max } }

    /// Push `value`.
    ///
    /// # Errors
    /// [`RuntimeErrorKind::StackOverflow`] when full.
    pub fn push(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.values.len() >= self.max {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop the top value.
    ///
    /// # Errors
    /// [`RuntimeErrorKind::StackUnderflow`] when empty.
    pub fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        self.values.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /// Value `distance` slots below the top (0 is the top), without popping.
    ///
    /// # Errors
    /// [`RuntimeErrorKind::StackUnderflow`] if the stack is not that deep.
    pub fn peek(&self, distance: usize) -> Result<Value, RuntimeErrorKind> {
        self.values
            .len()
            .checked_sub(distance + 1)
            .and_then(|i| self.values.get(i).copied())
            .ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Capacity in slots.
    #[must_use]
    pub const fn max(&self) -> usize { self.max }

    /// Values, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] { &self.values }

    /// Drop every value.
    pub fn reset(&mut self) { self.values.clear(); }

    /// `[ a ][ b ]` rendering for execution traces.
    #[must_use]
    pub const fn render<'a>(&'a self, heap: &'a Heap) -> StackDisplay<'a> {
        StackDisplay { stack: self, heap }
    }
}

/// [`fmt::Display`] adapter returned by [`Stack::render`].
pub struct StackDisplay<'a> {
    stack: &'a Stack,
    heap: &'a Heap,
}

impl fmt::Display for StackDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("          ")?;
        for value in self.stack.as_slice() {
            write!(f, "[ {} ]", self.heap.display(*value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bounded_push_pop() {
        let mut stack = Stack::new(2);
        stack.push(Value::Nil).unwrap();
        stack.push(Value::Bool(true)).unwrap();
        assert_eq!(stack.push(Value::Nil), Err(RuntimeErrorKind::StackOverflow));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), Ok(Value::Bool(true)));
        assert_eq!(stack.pop(), Ok(Value::Nil));
        assert_eq!(stack.pop(), Err(RuntimeErrorKind::StackUnderflow));
    }

    #[test]
    fn peek_by_distance() {
        let mut stack = Stack::new(4);
        stack.push(Value::Number(1.0)).unwrap();
        stack.push(Value::Number(2.0)).unwrap();
        assert_eq!(stack.peek(0), Ok(Value::Number(2.0)));
        assert_eq!(stack.peek(1), Ok(Value::Number(1.0)));
        assert_eq!(stack.peek(2), Err(RuntimeErrorKind::StackUnderflow));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn render_and_reset() {
        let mut heap = Heap::new();
        let s = heap.copy_string(b"x");
        let mut stack = Stack::new(4);
        stack.push(Value::Number(1.5)).unwrap();
        stack.push(Value::Obj(s)).unwrap();
        assert_eq!(stack.render(&heap).to_string(), "          [ 1.5 ][ x ]");
        stack.reset();
        assert!(stack.is_empty());
        assert_eq!(stack.max(), 4);
    }
}
