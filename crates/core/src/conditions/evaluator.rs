use crate::conditions::{CompiledCondition, Condition, Operands, Operator};
use crate::domain::product::{AttributeValue, ProductSnapshot};
use crate::errors::ConditionError;

/// Evaluate one condition against a product. Misconfigured conditions never
/// match; use [`evaluate_checked`] to see why.
pub fn evaluate(condition: &Condition, product: &ProductSnapshot) -> bool {
    evaluate_checked(condition, product).unwrap_or(false)
}

pub fn evaluate_checked(
    condition: &Condition,
    product: &ProductSnapshot,
) -> Result<bool, ConditionError> {
    let compiled = condition.compile()?;
    Ok(evaluate_compiled(&compiled, product))
}

pub fn evaluate_compiled(condition: &CompiledCondition, product: &ProductSnapshot) -> bool {
    let Some(actual) = product.attribute(condition.property) else {
        // An absent attribute is not equal to anything and matches nothing else.
        return condition.operator == Operator::NotEquals;
    };

    match (&condition.operands, actual) {
        (Operands::Numeric(low, high), AttributeValue::Number(value)) => {
            compare_ordered(condition.operator, &value, low, high.as_ref())
        }
        (Operands::Date(low, high), AttributeValue::Date(value)) => {
            compare_ordered(condition.operator, &value, low, high.as_ref())
        }
        (Operands::Text(expected), AttributeValue::Text(value))
        | (Operands::Text(expected), AttributeValue::Select(value)) => {
            compare_text(condition.operator, &value.to_lowercase(), expected)
        }
        (Operands::Boolean(expected), AttributeValue::Boolean(value)) => {
            match condition.operator {
                Operator::Equals => value == *expected,
                Operator::NotEquals => value != *expected,
                _ => false,
            }
        }
        // Operands are compiled from the property's own type, so the product
        // attribute always lines up; anything else is treated as a non-match.
        _ => false,
    }
}

fn compare_ordered<T: PartialOrd>(
    operator: Operator,
    actual: &T,
    value: &T,
    high: Option<&T>,
) -> bool {
    match operator {
        Operator::Equals => actual == value,
        Operator::NotEquals => actual != value,
        Operator::GreaterThan => actual > value,
        Operator::GreaterOrEqual => actual >= value,
        Operator::LessThan => actual < value,
        Operator::LessOrEqual => actual <= value,
        Operator::Between => high.is_some_and(|high| value <= actual && actual <= high),
        Operator::NotBetween => high.is_some_and(|high| !(value <= actual && actual <= high)),
        Operator::Contains | Operator::NotContains | Operator::StartsWith | Operator::EndsWith => {
            false
        }
    }
}

fn compare_text(operator: Operator, actual: &str, expected: &str) -> bool {
    match operator {
        Operator::Equals => actual == expected,
        Operator::NotEquals => actual != expected,
        Operator::Contains => actual.contains(expected),
        Operator::NotContains => !actual.contains(expected),
        Operator::StartsWith => actual.starts_with(expected),
        Operator::EndsWith => actual.ends_with(expected),
        _ => false,
    }
}
