//! The local variable array of a frame.

use crate::vm::error::{Error, Result};
use crate::vm::value::{Reference, Value};

/// A fixed-size array of local variable slots.
///
/// Values that occupy two indices (`long` and `double`) are stored in one slot followed by a
/// `None` value in the subsequent index. Writing over either half of such a pair invalidates the
/// other half, so a 64-bit value is never observed through a 32-bit neighbor.
#[derive(Debug, Clone)]
pub struct LocalVariables {
    slots: Vec<Option<Value>>,
}

macro_rules! typed {
    ($($get: ident, $set: ident, $variant: ident, $ty: ty, $name: expr;)*) => {
        $(
            pub fn $get(&self, index: usize) -> Result<$ty> {
                match self.get(index)? {
                    Value::$variant(v) => Ok(v),
                    v => Err(v.mismatch($name)),
                }
            }

            pub fn $set(&mut self, index: usize, value: $ty) -> Result<()> {
                self.set(index, Value::$variant(value))
            }
        )*
    };
}

impl LocalVariables {
    pub fn new(max_locals: usize) -> Self {
        LocalVariables { slots: vec![None; max_locals] }
    }

    /// Seeds a new array with call arguments, in order, starting at index 0. Category 2 arguments
    /// take two indices.
    pub fn with_arguments(max_locals: usize, args: Vec<Value>) -> Result<Self> {
        let mut locals = LocalVariables::new(max_locals);
        let mut index = 0;
        for arg in args {
            let category = arg.category();
            locals.set(index, arg)?;
            index += category;
        }
        Ok(locals)
    }

    /// The number of slots (`max_locals`).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(Error::InvalidLocalIndex { index: index, max_locals: self.slots.len() })
        }
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        self.check_index(index)?;
        match self.slots[index] {
            Some(ref value) => Ok(value.clone()),
            None => Err(Error::TypeMismatch {
                expected: "initialized local variable",
                found: format!("empty slot {}", index),
            }),
        }
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        self.check_index(index)?;
        // invalidate the slot after this one if we're storing a category 2 operand
        if value.category() == 2 {
            self.check_index(index + 1)?;
            self.slots[index + 1] = None;
        }
        // invalidate the slot before this one if it was formerly storing a category 2 operand
        if index > 0 {
            let previous_is_wide = self.slots[index - 1].as_ref()
                .map_or(false, |previous| previous.category() == 2);
            if previous_is_wide {
                self.slots[index - 1] = None;
            }
        }
        self.slots[index] = Some(value);
        Ok(())
    }

    typed! {
        get_int, set_int, Int, i32, "int";
        get_float, set_float, Float, f32, "float";
        get_long, set_long, Long, i64, "long";
        get_double, set_double, Double, f64, "double";
        get_reference, set_reference, Reference, Reference, "reference";
    }

    pub fn get_boolean(&self, index: usize) -> Result<bool> {
        self.get_int(index).map(|v| v & 1 != 0)
    }

    pub fn set_boolean(&mut self, index: usize, value: bool) -> Result<()> {
        self.set_int(index, value as i32)
    }

    pub fn get_byte(&self, index: usize) -> Result<i8> {
        self.get_int(index).map(|v| v as i8)
    }

    pub fn set_byte(&mut self, index: usize, value: i8) -> Result<()> {
        self.set_int(index, value as i32)
    }

    pub fn get_char(&self, index: usize) -> Result<u16> {
        self.get_int(index).map(|v| v as u16)
    }

    pub fn set_char(&mut self, index: usize, value: u16) -> Result<()> {
        self.set_int(index, value as i32)
    }

    pub fn get_short(&self, index: usize) -> Result<i16> {
        self.get_int(index).map(|v| v as i16)
    }

    pub fn set_short(&mut self, index: usize, value: i16) -> Result<()> {
        self.set_int(index, value as i32)
    }

    pub fn get_return_address(&self, index: usize) -> Result<usize> {
        match self.get(index)? {
            Value::ReturnAddress(address) => Ok(address),
            v => Err(v.mismatch("returnAddress")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wide_values_take_two_slots() {
        let mut locals = LocalVariables::new(4);
        locals.set_long(1, 1 << 40).unwrap();
        assert_eq!(locals.get_long(1).unwrap(), 1 << 40);
        assert!(locals.get_int(2).is_err());

        // overwriting the upper half kills the long
        locals.set_int(2, 5).unwrap();
        assert!(locals.get(1).is_err());
        assert_eq!(locals.get_int(2).unwrap(), 5);

        // overwriting with a long kills the int it overlaps
        locals.set_double(2, 0.5).unwrap();
        assert_eq!(locals.get_double(2).unwrap(), 0.5);
        assert!(locals.get(3).is_err());
    }

    #[test]
    fn test_index_bounds() {
        let mut locals = LocalVariables::new(2);
        match locals.set_long(1, 0) {
            Err(Error::InvalidLocalIndex { index: 2, max_locals: 2 }) => (),
            other => panic!("expected invalid index, got {:?}", other),
        }
        match locals.get(2) {
            Err(Error::InvalidLocalIndex { index: 2, .. }) => (),
            other => panic!("expected invalid index, got {:?}", other),
        }
    }

    #[test]
    fn test_with_arguments() {
        let args = vec![Value::Reference(Reference::Null), Value::Long(3), Value::Int(9)];
        let locals = LocalVariables::with_arguments(5, args).unwrap();
        assert!(locals.get_reference(0).unwrap().is_null());
        assert_eq!(locals.get_long(1).unwrap(), 3);
        assert_eq!(locals.get_int(3).unwrap(), 9);
        assert!(LocalVariables::with_arguments(1, vec![Value::Double(1.0)]).is_err());
    }

    #[test]
    fn test_narrow_accessors() {
        let mut locals = LocalVariables::new(4);
        locals.set_char(0, 'x' as u16).unwrap();
        locals.set_boolean(1, true).unwrap();
        locals.set_short(2, -2).unwrap();
        locals.set_byte(3, -128).unwrap();
        assert_eq!(locals.get_char(0).unwrap(), 'x' as u16);
        assert!(locals.get_boolean(1).unwrap());
        assert_eq!(locals.get_short(2).unwrap(), -2);
        assert_eq!(locals.get_byte(3).unwrap(), -128);
        assert_eq!(locals.get_int(3).unwrap(), -128);
    }
}
