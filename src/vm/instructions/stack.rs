use crate::vm::bytecode::op::Stack;
use crate::vm::error::Result;
use crate::vm::frame::Frame;
use crate::vm::operand_stack::OperandStack;
use crate::vm::value::Value;

use super::Action;

fn push_all(stack: &mut OperandStack, values: Vec<Value>) -> Result<()> {
    for value in values {
        stack.push(value)?;
    }
    Ok(())
}

/// The stack manipulation instructions. Forms are chosen by the categories of the values on top
/// of the stack; a category 2 value is never split.
pub fn execute(op: Stack, frame: &mut Frame) -> Result<Action> {
    manipulate(op, &mut frame.operand_stack)?;
    Ok(Action::Continue)
}

fn manipulate(op: Stack, stack: &mut OperandStack) -> Result<()> {
    match op {
        Stack::Pop => {
            stack.pop_category1()?;
        },
        Stack::Pop2 => {
            if stack.pop()?.category() == 1 {
                stack.pop_category1()?;
            }
        },
        Stack::Dup => {
            let value = stack.pop_category1()?;
            push_all(stack, vec![value.clone(), value])?;
        },
        Stack::Dup_x1 => {
            let value1 = stack.pop_category1()?;
            let value2 = stack.pop_category1()?;
            push_all(stack, vec![value1.clone(), value2, value1])?;
        },
        Stack::Dup_x2 => {
            let value1 = stack.pop_category1()?;
            let value2 = stack.pop()?;
            if value2.category() == 2 {
                push_all(stack, vec![value1.clone(), value2, value1])?;
            } else {
                let value3 = stack.pop_category1()?;
                push_all(stack, vec![value1.clone(), value3, value2, value1])?;
            }
        },
        Stack::Dup2 => {
            let value1 = stack.pop()?;
            if value1.category() == 2 {
                push_all(stack, vec![value1.clone(), value1])?;
            } else {
                let value2 = stack.pop_category1()?;
                push_all(stack, vec![value2.clone(), value1.clone(), value2, value1])?;
            }
        },
        Stack::Dup2_x1 => {
            let value1 = stack.pop()?;
            if value1.category() == 2 {
                let value2 = stack.pop_category1()?;
                push_all(stack, vec![value1.clone(), value2, value1])?;
            } else {
                let value2 = stack.pop_category1()?;
                let value3 = stack.pop_category1()?;
                push_all(stack, vec![value2.clone(), value1.clone(), value3, value2, value1])?;
            }
        },
        Stack::Dup2_x2 => {
            let value1 = stack.pop()?;
            if value1.category() == 2 {
                let value2 = stack.pop()?;
                if value2.category() == 2 {
                    push_all(stack, vec![value1.clone(), value2, value1])?;
                } else {
                    let value3 = stack.pop_category1()?;
                    push_all(stack, vec![value1.clone(), value3, value2, value1])?;
                }
            } else {
                let value2 = stack.pop_category1()?;
                let value3 = stack.pop()?;
                if value3.category() == 2 {
                    push_all(stack, vec![value2.clone(), value1.clone(), value3, value2, value1])?;
                } else {
                    let value4 = stack.pop_category1()?;
                    push_all(stack, vec![value2.clone(), value1.clone(), value4, value3, value2,
                                         value1])?;
                }
            }
        },
        Stack::Swap => {
            let value1 = stack.pop_category1()?;
            let value2 = stack.pop_category1()?;
            push_all(stack, vec![value1, value2])?;
        },
    }
    Ok(())
}
