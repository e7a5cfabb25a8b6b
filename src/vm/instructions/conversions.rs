use crate::vm::bytecode::op::Conversion;
use crate::vm::error::Result;
use crate::vm::frame::Frame;

use super::Action;

macro_rules! convert {
    ($frame: ident, $pop: ident, $push: ident, |$value: ident| $result: expr) => ({
        let $value = $frame.operand_stack.$pop()?;
        $frame.operand_stack.$push($result)?;
    });
}

/// Numeric conversions. Float-to-integer casts in Rust saturate and map NaN to zero, which is
/// exactly the rounding the conversion instructions specify.
pub fn execute(op: Conversion, frame: &mut Frame) -> Result<Action> {
    match op {
        Conversion::I2l => convert!(frame, pop_int, push_long, |v| v as i64),
        Conversion::I2f => convert!(frame, pop_int, push_float, |v| v as f32),
        Conversion::I2d => convert!(frame, pop_int, push_double, |v| v as f64),
        Conversion::L2i => convert!(frame, pop_long, push_int, |v| v as i32),
        Conversion::L2f => convert!(frame, pop_long, push_float, |v| v as f32),
        Conversion::L2d => convert!(frame, pop_long, push_double, |v| v as f64),
        Conversion::F2i => convert!(frame, pop_float, push_int, |v| v as i32),
        Conversion::F2l => convert!(frame, pop_float, push_long, |v| v as i64),
        Conversion::F2d => convert!(frame, pop_float, push_double, |v| v as f64),
        Conversion::D2i => convert!(frame, pop_double, push_int, |v| v as i32),
        Conversion::D2l => convert!(frame, pop_double, push_long, |v| v as i64),
        Conversion::D2f => convert!(frame, pop_double, push_float, |v| v as f32),
        Conversion::I2b => convert!(frame, pop_int, push_int, |v| v as i8 as i32),
        Conversion::I2c => convert!(frame, pop_int, push_int, |v| v as u16 as i32),
        Conversion::I2s => convert!(frame, pop_int, push_int, |v| v as i16 as i32),
    }
    Ok(Action::Continue)
}
