use crate::error::Result;
use crate::primitives::wrong_type;
use crate::universe::Universe;
use crate::value::Value;

/// Concatenates two strings into a new dynamic string.
pub fn concatenate(universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
    const SIGNATURE: &str = "String +";

    let a = left.as_str().ok_or_else(|| wrong_type(SIGNATURE, left))?;
    let b = right.as_str().ok_or_else(|| wrong_type(SIGNATURE, right))?;

    let mut text = String::with_capacity(a.len() + b.len());
    text.push_str(a);
    text.push_str(b);
    Ok(universe.new_string(text))
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::universe::Universe;

    #[test]
    fn concatenation_allocates_one_string() {
        let universe = Universe::new();
        let a = universe.new_string("foo");
        let b = universe.new_string("bar");
        assert_eq!(universe.registry().live_count(), 2);

        let c = a.add(&universe, &b).unwrap();
        assert_eq!(c.as_str(), Some("foobar"));
        assert!(c.is_instance_of(&universe.core.string));
        assert_eq!(universe.registry().live_count(), 3);
    }

    #[test]
    fn strings_only_support_addition() {
        let universe = Universe::new();
        let a = universe.new_string("foo");
        let two = universe.integer(2);

        assert_eq!(a.add(&universe, &two).unwrap_err().kind_name(), "IllegalArgument");
        assert_eq!(
            a.subtract(&universe, &two).unwrap_err().kind_name(),
            "OperationNotSupported"
        );
        assert_eq!(
            a.multiply(&universe, &two).unwrap_err().kind_name(),
            "OperationNotSupported"
        );
    }

    #[test]
    fn strings_compare_by_content() {
        let universe = Universe::new();
        let a = universe.new_string("abc");
        let b = universe.new_string("abd");
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
        assert_eq!(a, universe.new_string("abc"));
        assert_eq!(
            a.compare(&universe.integer(1)).unwrap_err().kind_name(),
            "OperationNotSupported"
        );
    }
}
