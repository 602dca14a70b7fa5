//! Identity comparison.
//!
//! This is the only equality the engine uses. Primitives compare by content,
//! shared values by allocation. NaN matches NaN so that a numeric placeholder
//! kept across a state transition is not mistaken for a removal.

use crate::value::{rc_addr, Value};

/// Whether `a` and `b` are the same value for survival purposes.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Seq(x), Value::Seq(y)) => x.ptr_eq(y),
        (Value::Map(x), Value::Map(y)) => x.ptr_eq(y),
        (Value::Resource(x), Value::Resource(y)) => rc_addr(x) == rc_addr(y),
        (Value::Opaque(x), Value::Opaque(y)) => rc_addr(x) == rc_addr(y),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceFn;
    use crate::value::{Map, Seq};

    #[test]
    fn nan_matches_itself() {
        assert!(same_value(&Value::nan(), &Value::nan()));
        assert!(!same_value(&Value::nan(), &Value::from(0.0)));
    }

    #[test]
    fn signed_zeros_match() {
        assert!(same_value(&Value::from(0.0), &Value::from(-0.0)));
    }

    #[test]
    fn primitives_compare_by_content() {
        assert!(same_value(&Value::from("id"), &Value::from(String::from("id"))));
        assert!(same_value(&Value::Undefined, &Value::Undefined));
        assert!(!same_value(&Value::Undefined, &Value::Null));
        assert!(!same_value(&Value::from(true), &Value::from(1.0)));
    }

    #[test]
    fn composites_compare_by_reference() {
        let seq = Seq::new();
        assert!(same_value(&Value::Seq(seq.clone()), &Value::Seq(seq)));
        assert!(!same_value(&Value::Seq(Seq::new()), &Value::Seq(Seq::new())));
        assert!(!same_value(&Value::Map(Map::new()), &Value::Map(Map::new())));
    }

    #[test]
    fn resources_compare_by_reference() {
        let res = Value::resource(ResourceFn::new("r", || Ok(())));
        let twin = Value::resource(ResourceFn::new("r", || Ok(())));
        assert!(same_value(&res, &res.clone()));
        assert!(!same_value(&res, &twin));
    }
}
