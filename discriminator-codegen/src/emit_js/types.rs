/// Pure functions: InstanceType -> JS condition strings.
use crate::ast::InstanceType;

/// A JS expression that is TRUE when `val` has type `t`.
pub fn type_check(t: InstanceType, val: &str) -> String {
    match t {
        InstanceType::Null => format!("{val} === null"),
        InstanceType::Boolean => format!("typeof {val} === \"boolean\""),
        InstanceType::Object => format!("_obj({val})"),
        InstanceType::Array => format!("Array.isArray({val})"),
        InstanceType::Number => format!("typeof {val} === \"number\""),
        InstanceType::Integer => format!("Number.isInteger({val})"),
        InstanceType::String => format!("typeof {val} === \"string\""),
    }
}

/// A JS expression that is TRUE when `val` matches NONE of `types`.
pub fn type_condition(types: &[InstanceType], val: &str) -> String {
    match types {
        [single] => match single {
            InstanceType::Null => format!("{val} !== null"),
            InstanceType::Boolean => format!("typeof {val} !== \"boolean\""),
            InstanceType::Object => format!("!_obj({val})"),
            InstanceType::Array => format!("!Array.isArray({val})"),
            InstanceType::Number => format!("typeof {val} !== \"number\""),
            InstanceType::Integer => format!("!Number.isInteger({val})"),
            InstanceType::String => format!("typeof {val} !== \"string\""),
        },
        _ => {
            let checks: Vec<String> = types.iter().map(|t| type_check(*t, val)).collect();
            format!("!({})", checks.join(" || "))
        }
    }
}
