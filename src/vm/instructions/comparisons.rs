use std::cmp::Ordering;

use crate::vm::bytecode::op::Comparison;
use crate::vm::error::Result;
use crate::vm::frame::Frame;

use super::Action;

/// Three-way comparison pushing -1, 0 or 1. `unordered` is the result when either operand is NaN:
/// -1 for the `l` instructions and 1 for the `g` instructions.
pub fn compare<T: PartialOrd>(value1: T, value2: T, unordered: i32) -> i32 {
    match value1.partial_cmp(&value2) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None => unordered,
    }
}

macro_rules! compare_with {
    ($frame: ident, $pop: ident, $unordered: expr) => ({
        let value2 = $frame.operand_stack.$pop()?;
        let value1 = $frame.operand_stack.$pop()?;
        $frame.operand_stack.push_int(compare(value1, value2, $unordered))?;
    });
}

pub fn execute(op: Comparison, frame: &mut Frame) -> Result<Action> {
    let (taken, offset) = match op {
        Comparison::Lcmp => {
            compare_with!(frame, pop_long, 0);
            return Ok(Action::Continue);
        },
        Comparison::Fcmpl => {
            compare_with!(frame, pop_float, -1);
            return Ok(Action::Continue);
        },
        Comparison::Fcmpg => {
            compare_with!(frame, pop_float, 1);
            return Ok(Action::Continue);
        },
        Comparison::Dcmpl => {
            compare_with!(frame, pop_double, -1);
            return Ok(Action::Continue);
        },
        Comparison::Dcmpg => {
            compare_with!(frame, pop_double, 1);
            return Ok(Action::Continue);
        },
        Comparison::Ifeq { offset } => (frame.operand_stack.pop_int()? == 0, offset),
        Comparison::Ifne { offset } => (frame.operand_stack.pop_int()? != 0, offset),
        Comparison::Iflt { offset } => (frame.operand_stack.pop_int()? < 0, offset),
        Comparison::Ifge { offset } => (frame.operand_stack.pop_int()? >= 0, offset),
        Comparison::Ifgt { offset } => (frame.operand_stack.pop_int()? > 0, offset),
        Comparison::Ifle { offset } => (frame.operand_stack.pop_int()? <= 0, offset),
        Comparison::If_icmpeq { offset } => (pop_ints(frame, |a, b| a == b)?, offset),
        Comparison::If_icmpne { offset } => (pop_ints(frame, |a, b| a != b)?, offset),
        Comparison::If_icmplt { offset } => (pop_ints(frame, |a, b| a < b)?, offset),
        Comparison::If_icmpge { offset } => (pop_ints(frame, |a, b| a >= b)?, offset),
        Comparison::If_icmpgt { offset } => (pop_ints(frame, |a, b| a > b)?, offset),
        Comparison::If_icmple { offset } => (pop_ints(frame, |a, b| a <= b)?, offset),
        Comparison::If_acmpeq { offset } => {
            let value2 = frame.operand_stack.pop_reference()?;
            let value1 = frame.operand_stack.pop_reference()?;
            (value1 == value2, offset)
        },
        Comparison::If_acmpne { offset } => {
            let value2 = frame.operand_stack.pop_reference()?;
            let value1 = frame.operand_stack.pop_reference()?;
            (value1 != value2, offset)
        },
    };
    branch_if(frame, taken, offset)
}

fn pop_ints<F: Fn(i32, i32) -> bool>(frame: &mut Frame, predicate: F) -> Result<bool> {
    let value2 = frame.operand_stack.pop_int()?;
    let value1 = frame.operand_stack.pop_int()?;
    Ok(predicate(value1, value2))
}

/// Sets `next_pc` to the branch target if the branch is taken. A fall-through leaves the
/// sequential successor in place.
pub fn branch_if(frame: &mut Frame, taken: bool, offset: i32) -> Result<Action> {
    if taken {
        frame.next_pc = frame.branch_target(offset)?;
    }
    Ok(Action::Continue)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nan_sentinels() {
        assert_eq!(compare(f32::NAN, 1.0, 1), 1);
        assert_eq!(compare(f32::NAN, 1.0, -1), -1);
        assert_eq!(compare(1.0, f32::NAN, 1), 1);
        assert_eq!(compare(1.0, f32::NAN, -1), -1);
        assert_eq!(compare(f64::NAN, f64::NAN, 1), 1);
        assert_eq!(compare(f64::NAN, f64::NAN, -1), -1);
    }

    #[test]
    fn test_ordinary_ordering() {
        for &unordered in &[-1, 1] {
            assert_eq!(compare(1.0f32, 2.0, unordered), -1);
            assert_eq!(compare(2.0f32, 2.0, unordered), 0);
            assert_eq!(compare(3.0f32, 2.0, unordered), 1);
            assert_eq!(compare(-0.0f64, 0.0, unordered), 0);
            assert_eq!(compare(f64::NEG_INFINITY, 0.0, unordered), -1);
        }
        assert_eq!(compare(i64::min_value(), i64::max_value(), 0), -1);
    }
}
