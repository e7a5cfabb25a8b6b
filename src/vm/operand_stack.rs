//! The operand stack of a frame.

use crate::vm::error::{Error, Result};
use crate::vm::sig::Type;
use crate::vm::value::{Reference, Value};

/// A height-bounded stack of values. `long` and `double` values are stored as one entry but count
/// as two slots against `max_stack`, and can only be popped as a whole.
#[derive(Debug, Clone)]
pub struct OperandStack {
    values: Vec<Value>,
    /// The current height in slots.
    size: usize,
    max_stack: usize,
}

macro_rules! typed {
    ($($push: ident, $pop: ident, $variant: ident, $ty: ty, $name: expr;)*) => {
        $(
            pub fn $push(&mut self, value: $ty) -> Result<()> {
                self.push(Value::$variant(value))
            }

            pub fn $pop(&mut self) -> Result<$ty> {
                match self.pop()? {
                    Value::$variant(v) => Ok(v),
                    v => Err(v.mismatch($name)),
                }
            }
        )*
    };
}

impl OperandStack {
    pub fn new(max_stack: usize) -> Self {
        OperandStack {
            values: Vec::with_capacity(max_stack),
            size: 0,
            max_stack: max_stack,
        }
    }

    /// The current height in slots.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_stack(&self) -> usize {
        self.max_stack
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.size = 0;
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        let size = self.size + value.category();
        if size > self.max_stack {
            return Err(Error::OperandStackOverflow { max_stack: self.max_stack });
        }
        self.size = size;
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value> {
        let value = self.values.pop().ok_or(Error::OperandStackUnderflow)?;
        self.size -= value.category();
        Ok(value)
    }

    /// Pops a value that must occupy exactly one slot.
    pub fn pop_category1(&mut self) -> Result<Value> {
        match self.pop()? {
            v @ Value::Long(_) | v @ Value::Double(_) => Err(v.mismatch("category 1 value")),
            v => Ok(v),
        }
    }

    pub fn peek(&self) -> Result<&Value> {
        self.values.last().ok_or(Error::OperandStackUnderflow)
    }

    typed! {
        push_int, pop_int, Int, i32, "int";
        push_float, pop_float, Float, f32, "float";
        push_long, pop_long, Long, i64, "long";
        push_double, pop_double, Double, f64, "double";
        push_reference, pop_reference, Reference, Reference, "reference";
    }

    pub fn push_boolean(&mut self, value: bool) -> Result<()> {
        self.push_int(value as i32)
    }

    pub fn pop_boolean(&mut self) -> Result<bool> {
        self.pop_int().map(|v| v & 1 != 0)
    }

    pub fn push_byte(&mut self, value: i8) -> Result<()> {
        self.push_int(value as i32)
    }

    pub fn pop_byte(&mut self) -> Result<i8> {
        self.pop_int().map(|v| v as i8)
    }

    pub fn push_char(&mut self, value: u16) -> Result<()> {
        self.push_int(value as i32)
    }

    pub fn pop_char(&mut self) -> Result<u16> {
        self.pop_int().map(|v| v as u16)
    }

    pub fn push_short(&mut self, value: i16) -> Result<()> {
        self.push_int(value as i32)
    }

    pub fn pop_short(&mut self) -> Result<i16> {
        self.pop_int().map(|v| v as i16)
    }

    /// Pops a value of the given type, checking that the slot holds that kind of value.
    /// Sub-`int` types are truncated the way their narrow accessors are.
    pub fn pop_typed(&mut self, ty: &Type) -> Result<Value> {
        match *ty {
            Type::Boolean => self.pop_boolean().map(|v| Value::Int(v as i32)),
            Type::Byte => self.pop_byte().map(|v| Value::Int(v as i32)),
            Type::Char => self.pop_char().map(|v| Value::Int(v as i32)),
            Type::Short => self.pop_short().map(|v| Value::Int(v as i32)),
            Type::Int => self.pop_int().map(Value::Int),
            Type::Float => self.pop_float().map(Value::Float),
            Type::Long => self.pop_long().map(Value::Long),
            Type::Double => self.pop_double().map(Value::Double),
            Type::Reference(_) => self.pop_reference().map(Value::Reference),
        }
    }

    /// Pops the arguments of a call with the given parameter types (and a receiver, if
    /// `has_this`), returning them in declaration order with the receiver first.
    pub fn pop_arguments(&mut self, params: &[Type], has_this: bool) -> Result<Vec<Value>> {
        let mut args = Vec::with_capacity(params.len() + 1);
        for param in params.iter().rev() {
            args.push(self.pop_typed(param)?);
        }
        if has_this {
            args.push(Value::Reference(self.pop_reference()?));
        }
        args.reverse();
        Ok(args)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lifo_and_height() {
        let mut stack = OperandStack::new(6);
        stack.push_int(1).unwrap();
        stack.push_long(2).unwrap();
        stack.push_float(3.0).unwrap();
        stack.push_double(4.0).unwrap();
        assert_eq!(stack.size(), 6);
        assert_eq!(stack.pop_double().unwrap(), 4.0);
        assert_eq!(stack.pop_float().unwrap(), 3.0);
        assert_eq!(stack.size(), 3);
        assert_eq!(stack.pop_long().unwrap(), 2);
        assert_eq!(stack.pop_int().unwrap(), 1);
        assert_eq!(stack.size(), 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_long_cannot_be_popped_as_two_ints() {
        let mut stack = OperandStack::new(4);
        stack.push_int(7).unwrap();
        stack.push_int(8).unwrap();
        match stack.pop_long() {
            Err(Error::TypeMismatch { expected: "long", .. }) => (),
            other => panic!("expected a type mismatch, got {:?}", other),
        }

        let mut stack = OperandStack::new(4);
        stack.push_long(-1).unwrap();
        assert!(stack.pop_int().is_err());
    }

    #[test]
    fn test_bounds() {
        let mut stack = OperandStack::new(2);
        match stack.pop() {
            Err(Error::OperandStackUnderflow) => (),
            other => panic!("expected underflow, got {:?}", other),
        }
        stack.push_int(1).unwrap();
        match stack.push_long(1) {
            Err(Error::OperandStackOverflow { max_stack: 2 }) => (),
            other => panic!("expected overflow, got {:?}", other),
        }
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn test_narrow_types() {
        let mut stack = OperandStack::new(4);
        stack.push_boolean(true).unwrap();
        stack.push_byte(-3).unwrap();
        stack.push_char(0xffff).unwrap();
        stack.push_short(-300).unwrap();
        assert_eq!(stack.pop_short().unwrap(), -300);
        assert_eq!(stack.pop_char().unwrap(), 0xffff);
        assert_eq!(stack.pop_byte().unwrap(), -3);
        assert!(stack.pop_boolean().unwrap());

        stack.push_int(0x1ff).unwrap();
        assert_eq!(stack.pop_byte().unwrap(), -1);
    }

    #[test]
    fn test_pop_arguments() {
        let mut stack = OperandStack::new(8);
        stack.push_reference(Reference::Null).unwrap();
        stack.push_int(9).unwrap();
        stack.push_double(2.5).unwrap();
        let args = stack.pop_arguments(&[Type::Int, Type::Double], true).unwrap();
        assert_eq!(stack.size(), 0);
        assert_eq!(args.len(), 3);
        match (&args[0], &args[1], &args[2]) {
            (&Value::Reference(Reference::Null), &Value::Int(9), &Value::Double(d)) =>
                assert_eq!(d, 2.5),
            other => panic!("unexpected arguments {:?}", other),
        }
    }
}
