use crate::vm::bytecode::op::Math;
use crate::vm::error::{Error, Result};
use crate::vm::frame::Frame;

use super::Action;

/// Shift amounts of `int` shifts use only their low five bits.
pub fn ishl(value: i32, shift: i32) -> i32 {
    value.wrapping_shl((shift & 0x1f) as u32)
}

pub fn ishr(value: i32, shift: i32) -> i32 {
    value >> (shift & 0x1f)
}

pub fn iushr(value: i32, shift: i32) -> i32 {
    ((value as u32) >> (shift & 0x1f)) as i32
}

/// Shift amounts of `long` shifts use only their low six bits.
pub fn lshl(value: i64, shift: i32) -> i64 {
    value.wrapping_shl((shift & 0x3f) as u32)
}

pub fn lshr(value: i64, shift: i32) -> i64 {
    value >> (shift & 0x3f)
}

pub fn lushr(value: i64, shift: i32) -> i64 {
    ((value as u64) >> (shift & 0x3f)) as i64
}

macro_rules! binary {
    ($frame: ident, $pop: ident, $push: ident, |$value1: ident, $value2: ident| $result: expr) => ({
        let $value2 = $frame.operand_stack.$pop()?;
        let $value1 = $frame.operand_stack.$pop()?;
        $frame.operand_stack.$push($result)?;
    });
}

macro_rules! shift {
    ($frame: ident, $pop: ident, $push: ident, $f: ident) => ({
        let shift = $frame.operand_stack.pop_int()?;
        let value = $frame.operand_stack.$pop()?;
        $frame.operand_stack.$push($f(value, shift))?;
    });
}

pub fn execute(op: Math, frame: &mut Frame) -> Result<Action> {
    match op {
        Math::Iadd => binary!(frame, pop_int, push_int, |a, b| a.wrapping_add(b)),
        Math::Ladd => binary!(frame, pop_long, push_long, |a, b| a.wrapping_add(b)),
        Math::Fadd => binary!(frame, pop_float, push_float, |a, b| a + b),
        Math::Dadd => binary!(frame, pop_double, push_double, |a, b| a + b),
        Math::Isub => binary!(frame, pop_int, push_int, |a, b| a.wrapping_sub(b)),
        Math::Lsub => binary!(frame, pop_long, push_long, |a, b| a.wrapping_sub(b)),
        Math::Fsub => binary!(frame, pop_float, push_float, |a, b| a - b),
        Math::Dsub => binary!(frame, pop_double, push_double, |a, b| a - b),
        Math::Imul => binary!(frame, pop_int, push_int, |a, b| a.wrapping_mul(b)),
        Math::Lmul => binary!(frame, pop_long, push_long, |a, b| a.wrapping_mul(b)),
        Math::Fmul => binary!(frame, pop_float, push_float, |a, b| a * b),
        Math::Dmul => binary!(frame, pop_double, push_double, |a, b| a * b),
        Math::Idiv => binary!(frame, pop_int, push_int, |a, b| {
            if b == 0 { return Err(Error::ArithmeticDivideByZero) }
            a.wrapping_div(b)
        }),
        Math::Ldiv => binary!(frame, pop_long, push_long, |a, b| {
            if b == 0 { return Err(Error::ArithmeticDivideByZero) }
            a.wrapping_div(b)
        }),
        Math::Fdiv => binary!(frame, pop_float, push_float, |a, b| a / b),
        Math::Ddiv => binary!(frame, pop_double, push_double, |a, b| a / b),
        Math::Irem => binary!(frame, pop_int, push_int, |a, b| {
            if b == 0 { return Err(Error::ArithmeticDivideByZero) }
            a.wrapping_rem(b)
        }),
        Math::Lrem => binary!(frame, pop_long, push_long, |a, b| {
            if b == 0 { return Err(Error::ArithmeticDivideByZero) }
            a.wrapping_rem(b)
        }),
        // `%` on floats truncates like fmod, which is what frem and drem specify
        Math::Frem => binary!(frame, pop_float, push_float, |a, b| a % b),
        Math::Drem => binary!(frame, pop_double, push_double, |a, b| a % b),
        Math::Ineg => {
            let value = frame.operand_stack.pop_int()?;
            frame.operand_stack.push_int(value.wrapping_neg())?;
        },
        Math::Lneg => {
            let value = frame.operand_stack.pop_long()?;
            frame.operand_stack.push_long(value.wrapping_neg())?;
        },
        Math::Fneg => {
            let value = frame.operand_stack.pop_float()?;
            frame.operand_stack.push_float(-value)?;
        },
        Math::Dneg => {
            let value = frame.operand_stack.pop_double()?;
            frame.operand_stack.push_double(-value)?;
        },
        Math::Ishl => shift!(frame, pop_int, push_int, ishl),
        Math::Lshl => shift!(frame, pop_long, push_long, lshl),
        Math::Ishr => shift!(frame, pop_int, push_int, ishr),
        Math::Lshr => shift!(frame, pop_long, push_long, lshr),
        Math::Iushr => shift!(frame, pop_int, push_int, iushr),
        Math::Lushr => shift!(frame, pop_long, push_long, lushr),
        Math::Iand => binary!(frame, pop_int, push_int, |a, b| a & b),
        Math::Land => binary!(frame, pop_long, push_long, |a, b| a & b),
        Math::Ior => binary!(frame, pop_int, push_int, |a, b| a | b),
        Math::Lor => binary!(frame, pop_long, push_long, |a, b| a | b),
        Math::Ixor => binary!(frame, pop_int, push_int, |a, b| a ^ b),
        Math::Lxor => binary!(frame, pop_long, push_long, |a, b| a ^ b),
        Math::Iinc { index, constant } => {
            let value = frame.local_variables.get_int(index as usize)?;
            frame.local_variables.set_int(index as usize, value.wrapping_add(constant as i32))?;
        },
    }
    Ok(Action::Continue)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_int_shifts_mask_to_five_bits() {
        assert_eq!(ishl(1, 0), 1);
        assert_eq!(ishl(1, 31), i32::min_value());
        assert_eq!(ishl(1, 32), 1);
        assert_eq!(ishl(1, 33), 2);
        assert_eq!(ishl(1, -1), i32::min_value());
        assert_eq!(ishr(-8, 1), -4);
        assert_eq!(ishr(-8, 33), -4);
        assert_eq!(ishr(i32::min_value(), 31), -1);
        assert_eq!(iushr(-1, 28), 0xf);
        assert_eq!(iushr(-1, 32), -1);
        assert_eq!(iushr(-1, 60), 0xf);
    }

    #[test]
    fn test_long_shifts_mask_to_six_bits() {
        assert_eq!(lshl(1, 0), 1);
        assert_eq!(lshl(1, 63), i64::min_value());
        assert_eq!(lshl(1, 64), 1);
        assert_eq!(lshl(1, 65), 2);
        assert_eq!(lshr(-16, 66), -4);
        assert_eq!(lshr(i64::min_value(), 63), -1);
        assert_eq!(lushr(-1, 60), 0xf);
        assert_eq!(lushr(-1, 64), -1);
        assert_eq!(lushr(-1, 124), 0xf);
    }
}
