//! Arithmetic-logic unit: a pure function over two machine words.
//!
//! Division is floor division (the quotient rounds toward negative
//! infinity), and a zero divisor is a fatal error.

use crate::command::OpType;
use crate::error::SimError;

/// Apply `op` to `a` and `b`.
pub fn execute(op: OpType, a: i64, b: i64) -> Result<i64, SimError> {
    match op {
        OpType::Add => Ok(a.wrapping_add(b)),
        OpType::Sub => Ok(a.wrapping_sub(b)),
        OpType::Mul => Ok(a.wrapping_mul(b)),
        OpType::Div => floor_div(a, b),
    }
}

fn floor_div(a: i64, b: i64) -> Result<i64, SimError> {
    if b == 0 {
        return Err(SimError::DivisionByZero);
    }
    let quotient = a.wrapping_div(b);
    // Truncation rounded toward zero; adjust when signs differ and the
    // division was inexact.
    if a % b != 0 && (a < 0) != (b < 0) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}
