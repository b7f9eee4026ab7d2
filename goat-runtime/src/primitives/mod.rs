/// Primitives for the **Integer** handler (inline and big integers).
pub mod integer;
/// Primitives for the **Real** handler.
pub mod real;
/// Primitives for **String** objects.
pub mod string;

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::universe::Universe;
use crate::value::Value;

/// A numeric view over a value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number<'a> {
    Integer(i64),
    BigInteger(&'a BigInt),
    Real(f64),
}

impl Number<'_> {
    pub(crate) fn to_f64(self) -> Result<f64> {
        match self {
            Number::Integer(value) => Ok(value as f64),
            Number::Real(value) => Ok(value),
            Number::BigInteger(value) => value.to_f64().ok_or_else(|| {
                Error::IllegalArgument(format!("{} is too big to be converted to a real", value))
            }),
        }
    }

    fn to_big(self) -> Option<BigInt> {
        match self {
            Number::Integer(value) => Some(BigInt::from(value)),
            Number::BigInteger(value) => Some(value.clone()),
            Number::Real(_) => None,
        }
    }
}

/// The three flavours of one arithmetic operation.
pub(crate) struct Operation {
    integer: fn(i64, i64) -> Option<i64>,
    big: fn(BigInt, BigInt) -> BigInt,
    real: fn(f64, f64) -> f64,
}

pub(crate) static PLUS: Operation = Operation {
    integer: i64::checked_add,
    big: |a, b| a + b,
    real: |a, b| a + b,
};

pub(crate) static MINUS: Operation = Operation {
    integer: i64::checked_sub,
    big: |a, b| a - b,
    real: |a, b| a - b,
};

pub(crate) static TIMES: Operation = Operation {
    integer: i64::checked_mul,
    big: |a, b| a * b,
    real: |a, b| a * b,
};

/// Performs an arithmetic operation between two numbers.
///
/// Integers overflow into big integers (which get demoted back when they fit),
/// and any real operand makes the result a real.
pub(crate) fn numeric_operation(
    universe: &Universe,
    signature: &str,
    operation: &Operation,
    left: &Value,
    right: &Value,
) -> Result<Value> {
    let a = left.number().ok_or_else(|| wrong_type(signature, left))?;
    let b = right.number().ok_or_else(|| wrong_type(signature, right))?;

    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => match (operation.integer)(a, b) {
            Some(value) => Ok(universe.integer(value)),
            None => Ok(universe.big_integer((operation.big)(BigInt::from(a), BigInt::from(b)))),
        },
        (Number::Real(_), _) | (_, Number::Real(_)) => {
            Ok(universe.real((operation.real)(a.to_f64()?, b.to_f64()?)))
        }
        (a, b) => match (a.to_big(), b.to_big()) {
            (Some(a), Some(b)) => Ok(universe.big_integer((operation.big)(a, b))),
            _ => Err(wrong_type(signature, right)),
        },
    }
}

/// Compares two numbers, across integer, big integer and real representations.
pub(crate) fn compare_numbers(left: &Value, right: &Value) -> Result<Ordering> {
    const SIGNATURE: &str = "Number compare";

    let a = left
        .number()
        .ok_or_else(|| left.object().unsupported("comparison"))?;
    let b = right.number().ok_or_else(|| wrong_type(SIGNATURE, right))?;

    let ordering = match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(&b)),
        (Number::Real(_), _) | (_, Number::Real(_)) => a.to_f64()?.partial_cmp(&b.to_f64()?),
        (a, b) => match (a.to_big(), b.to_big()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        },
    };

    ordering.ok_or_else(|| {
        Error::IllegalArgument(format!(
            "'{}': {} and {} are not ordered",
            SIGNATURE, left, right
        ))
    })
}

pub(crate) fn wrong_type(signature: &str, value: &Value) -> Error {
    Error::IllegalArgument(format!(
        "'{}': wrong type ({})",
        signature,
        value.object().type_name()
    ))
}
