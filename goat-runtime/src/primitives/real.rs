use crate::error::Result;
use crate::primitives::{numeric_operation, MINUS, PLUS, TIMES};
use crate::universe::Universe;
use crate::value::Value;

pub fn plus(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    numeric_operation(universe, "Real +", &PLUS, left, right)
}

pub fn minus(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    numeric_operation(universe, "Real -", &MINUS, left, right)
}

pub fn times(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    numeric_operation(universe, "Real *", &TIMES, left, right)
}
