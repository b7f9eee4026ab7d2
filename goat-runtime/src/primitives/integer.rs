use crate::error::Result;
use crate::primitives::{numeric_operation, MINUS, PLUS, TIMES};
use crate::universe::Universe;
use crate::value::Value;

pub fn plus(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    numeric_operation(universe, "Integer +", &PLUS, left, right)
}

pub fn minus(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    numeric_operation(universe, "Integer -", &MINUS, left, right)
}

pub fn times(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    numeric_operation(universe, "Integer *", &TIMES, left, right)
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use crate::object::ObjectKind;
    use crate::universe::Universe;
    use crate::value::Payload;

    #[test]
    fn inline_arithmetic_does_not_allocate() {
        let universe = Universe::new();
        let two = universe.integer(2);
        let three = universe.integer(3);

        let sum = two.add(&universe, &three).unwrap();
        assert_eq!(sum.payload(), Payload::Integer(5));
        assert!(sum.object().ptr_eq(&universe.core.integer_handler));

        let difference = two.subtract(&universe, &three).unwrap();
        assert_eq!(difference.payload(), Payload::Integer(-1));

        let product = two.multiply(&universe, &three).unwrap();
        assert_eq!(product.payload(), Payload::Integer(6));

        assert_eq!(universe.registry().live_count(), 0);
    }

    #[test]
    fn overflow_promotes_and_demotes() {
        let universe = Universe::new();
        let max = universe.integer(i64::MAX);
        let one = universe.integer(1);

        let big = max.add(&universe, &one).unwrap();
        assert_eq!(big.payload(), Payload::None);
        match big.object().kind() {
            ObjectKind::BigInteger(value) => {
                assert_eq!(*value, BigInt::from(i64::MAX) + BigInt::from(1))
            }
            _ => panic!("expected a big integer, got {:?}", big),
        }
        assert!(big.is_instance_of(&universe.core.integer));
        assert_eq!(universe.registry().live_count(), 1);

        let back = big.subtract(&universe, &one).unwrap();
        assert_eq!(back.payload(), Payload::Integer(i64::MAX));

        drop(big);
        assert_eq!(universe.registry().live_count(), 0);
    }

    #[test]
    fn mixing_with_reals_yields_reals() {
        let universe = Universe::new();
        let two = universe.integer(2);
        let half = universe.real(0.5);

        let sum = two.add(&universe, &half).unwrap();
        assert_eq!(sum.payload(), Payload::Real(2.5));
        assert!(sum.object().ptr_eq(&universe.core.real_handler));
        assert_eq!(sum.to_string(), "2.5");
    }

    #[test]
    fn non_numeric_operands_are_rejected() {
        let universe = Universe::new();
        let two = universe.integer(2);
        let text = universe.new_string("two");

        let err = two.add(&universe, &text).unwrap_err();
        assert_eq!(err.kind_name(), "IllegalArgument");
        assert_eq!(err.message(), "'Integer +': wrong type (String)");

        let err = universe.real(0.5).multiply(&universe, &text).unwrap_err();
        assert_eq!(err.message(), "'Real *': wrong type (String)");
    }
}
