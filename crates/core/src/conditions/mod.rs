//! Typed product conditions.
//!
//! A [`Condition`] pairs a product property with an operator and one or two
//! scalar operands. Operands arrive loosely typed (storefront forms post
//! strings), so a condition is first compiled against the property's declared
//! type; only compiled conditions are ever evaluated.

pub mod evaluator;

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{PropertyKey, PropertyType};
use crate::errors::ConditionError;

pub use evaluator::{evaluate, evaluate_checked};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "not_between")]
    NotBetween,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not_contains")]
    NotContains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
}

const ORDERED_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::GreaterOrEqual,
    Operator::LessThan,
    Operator::LessOrEqual,
    Operator::Between,
    Operator::NotBetween,
];

const TEXT_OPERATORS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::StartsWith,
    Operator::EndsWith,
];

const EQUALITY_OPERATORS: &[Operator] = &[Operator::Equals, Operator::NotEquals];

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }

    pub fn is_range(self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }

    pub fn supported_for(property_type: PropertyType) -> &'static [Operator] {
        match property_type {
            PropertyType::Numeric | PropertyType::Date => ORDERED_OPERATORS,
            PropertyType::Text => TEXT_OPERATORS,
            PropertyType::Boolean | PropertyType::Select => EQUALITY_OPERATORS,
        }
    }

    pub fn is_supported_for(self, property_type: PropertyType) -> bool {
        Self::supported_for(property_type).contains(&self)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loosely typed condition operand.
///
/// Variant order matters for untagged deserialization: JSON strings stay
/// text (so `"007"` keeps its zeros) and are coerced per property type later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Text(String),
    Number(Decimal),
}

impl Scalar {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => value.trim().parse::<Decimal>().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(value) => Some(Cow::Borrowed(value.as_str())),
            Self::Number(value) => Some(Cow::Owned(value.to_string())),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Some(true),
                "false" | "no" | "0" | "off" => Some(false),
                _ => None,
            },
            Self::Number(value) if *value == Decimal::ONE => Some(true),
            Self::Number(value) if value.is_zero() => Some(false),
            Self::Number(_) => None,
        }
    }

    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (read as UTC), a bare date
    /// (midnight UTC) or a number of seconds since the Unix epoch.
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(value) => parse_instant(value.trim()),
            Self::Number(value) => {
                let seconds = value.trunc().to_i64()?;
                Utc.timestamp_opt(seconds, 0).single()
            }
            Self::Bool(_) => None,
        }
    }
}

impl From<Decimal> for Scalar {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&parsed));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub property: PropertyKey,
    pub operator: Operator,
    pub value: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Scalar>,
}

impl Condition {
    pub fn new(property: PropertyKey, operator: Operator, value: impl Into<Scalar>) -> Self {
        Self { property, operator, value: value.into(), value2: None }
    }

    pub fn range(
        property: PropertyKey,
        operator: Operator,
        low: impl Into<Scalar>,
        high: impl Into<Scalar>,
    ) -> Self {
        Self { property, operator, value: low.into(), value2: Some(high.into()) }
    }

    pub fn validate(&self) -> Result<(), ConditionError> {
        self.compile().map(|_| ())
    }

    /// Type-check the operator and coerce operands for the property's type.
    pub fn compile(&self) -> Result<CompiledCondition, ConditionError> {
        let property = self.property;
        let property_type = property.property_type();
        if !self.operator.is_supported_for(property_type) {
            return Err(ConditionError::UnsupportedOperator {
                property,
                property_type,
                operator: self.operator,
            });
        }

        let mismatch = || ConditionError::ValueTypeMismatch { property, expected: property_type };

        let operands = match property_type {
            PropertyType::Numeric => {
                let low = self.value.as_decimal().ok_or_else(mismatch)?;
                let high = self.second_operand(|value| value.as_decimal())?;
                Operands::Numeric(low, high)
            }
            PropertyType::Date => {
                let low = self.value.as_instant().ok_or_else(mismatch)?;
                let high = self.second_operand(|value| value.as_instant())?;
                Operands::Date(low, high)
            }
            PropertyType::Text | PropertyType::Select => {
                let text = self.value.as_text().ok_or_else(mismatch)?;
                Operands::Text(text.to_lowercase())
            }
            PropertyType::Boolean => Operands::Boolean(self.value.as_bool().ok_or_else(mismatch)?),
        };

        Ok(CompiledCondition { property, operator: self.operator, operands })
    }

    fn second_operand<T: PartialOrd + Copy>(
        &self,
        coerce: impl Fn(&Scalar) -> Option<T>,
    ) -> Result<Option<T>, ConditionError> {
        if !self.operator.is_range() {
            return Ok(None);
        }

        let property = self.property;
        let mismatch =
            || ConditionError::ValueTypeMismatch { property, expected: property.property_type() };
        let raw = self.value2.as_ref().ok_or(ConditionError::MissingSecondValue {
            property,
            operator: self.operator,
        })?;
        let high = coerce(raw).ok_or_else(mismatch)?;
        let low = coerce(&self.value).ok_or_else(mismatch)?;
        if low > high {
            return Err(ConditionError::InvertedRange { property });
        }
        Ok(Some(high))
    }
}

/// A condition whose operands have been coerced to the property's type.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledCondition {
    pub property: PropertyKey,
    pub operator: Operator,
    pub operands: Operands,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operands {
    Numeric(Decimal, Option<Decimal>),
    Date(DateTime<Utc>, Option<DateTime<Utc>>),
    /// Lower-cased; text and select comparisons ignore case.
    Text(String),
    Boolean(bool),
}

/// Which of a campaign's two condition sets a condition came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionScope {
    Selection,
    Campaign,
}

impl ConditionScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Campaign => "campaign",
        }
    }
}

impl fmt::Display for ConditionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLogic {
    #[default]
    All,
    Any,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    #[serde(default)]
    pub logic: ConditionLogic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self { logic: ConditionLogic::All, conditions }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self { logic: ConditionLogic::Any, conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Every invalid condition with its position in the set.
    pub fn validate(&self) -> Vec<(usize, ConditionError)> {
        self.conditions
            .iter()
            .enumerate()
            .filter_map(|(index, condition)| condition.validate().err().map(|error| (index, error)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{Condition, ConditionLogic, ConditionSet, Operands, Operator, Scalar};
    use crate::domain::product::{PropertyKey, PropertyType};
    use crate::errors::ConditionError;

    #[test]
    fn operator_tables_follow_property_types() {
        assert!(Operator::Between.is_supported_for(PropertyType::Numeric));
        assert!(Operator::Between.is_supported_for(PropertyType::Date));
        assert!(Operator::StartsWith.is_supported_for(PropertyType::Text));
        assert!(!Operator::Contains.is_supported_for(PropertyType::Select));
        assert!(!Operator::GreaterThan.is_supported_for(PropertyType::Boolean));
        assert!(!Operator::GreaterThan.is_supported_for(PropertyType::Text));
    }

    #[test]
    fn untagged_scalars_keep_strings_as_text() {
        let parsed: Vec<Scalar> =
            serde_json::from_str(r#"["007", 12.5, true]"#).expect("scalars should parse");
        assert_eq!(parsed[0], Scalar::Text("007".to_owned()));
        assert_eq!(parsed[1].as_decimal(), Some(Decimal::new(125, 1)));
        assert_eq!(parsed[2], Scalar::Bool(true));
    }

    #[test]
    fn scalars_coerce_per_target_type() {
        assert_eq!(Scalar::from("19.99").as_decimal(), Some(Decimal::new(1999, 2)));
        assert_eq!(Scalar::from("yes").as_bool(), Some(true));
        assert_eq!(Scalar::from("maybe").as_bool(), None);
        assert_eq!(
            Scalar::from("2024-03-01").as_instant(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single()
        );
        assert_eq!(
            Scalar::from("2024-03-01T12:30:00+02:00").as_instant(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).single()
        );
        assert_eq!(
            Scalar::Number(Decimal::from(1_700_000_000)).as_instant(),
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
    }

    #[test]
    fn compile_rejects_operator_type_mismatch() {
        let condition = Condition::new(PropertyKey::Sku, Operator::GreaterThan, "ABC");
        assert_eq!(
            condition.validate(),
            Err(ConditionError::UnsupportedOperator {
                property: PropertyKey::Sku,
                property_type: PropertyType::Text,
                operator: Operator::GreaterThan,
            })
        );
    }

    #[test]
    fn compile_requires_ordered_range_bounds() {
        let missing = Condition::new(PropertyKey::Price, Operator::Between, Decimal::from(10));
        assert!(matches!(missing.validate(), Err(ConditionError::MissingSecondValue { .. })));

        let inverted = Condition::range(
            PropertyKey::Price,
            Operator::Between,
            Decimal::from(20),
            Decimal::from(10),
        );
        assert_eq!(
            inverted.validate(),
            Err(ConditionError::InvertedRange { property: PropertyKey::Price })
        );

        let point = Condition::range(
            PropertyKey::Price,
            Operator::Between,
            Decimal::from(10),
            Decimal::from(10),
        );
        assert!(point.validate().is_ok());
    }

    #[test]
    fn compile_coerces_text_operands_to_lowercase() {
        let compiled = Condition::new(PropertyKey::Sku, Operator::StartsWith, "TEE-")
            .compile()
            .expect("condition should compile");
        assert_eq!(compiled.operands, Operands::Text("tee-".to_owned()));
    }

    #[test]
    fn compile_rejects_non_numeric_values_for_numeric_properties() {
        let condition = Condition::new(PropertyKey::Weight, Operator::Equals, "heavy");
        assert_eq!(
            condition.validate(),
            Err(ConditionError::ValueTypeMismatch {
                property: PropertyKey::Weight,
                expected: PropertyType::Numeric,
            })
        );
    }

    #[test]
    fn condition_set_reports_invalid_positions() {
        let set = ConditionSet::any(vec![
            Condition::new(PropertyKey::Price, Operator::GreaterThan, Decimal::from(5)),
            Condition::new(PropertyKey::OnSale, Operator::Contains, "x"),
        ]);
        let invalid = set.validate();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].0, 1);
        assert_eq!(set.logic, ConditionLogic::Any);
    }

    #[test]
    fn condition_json_uses_symbolic_operators() {
        let condition: Condition = serde_json::from_str(
            r#"{"property":"regular_price","operator":"not_between","value":"10","value2":20}"#,
        )
        .expect("condition should parse");
        assert_eq!(condition.operator, Operator::NotBetween);
        assert!(condition.validate().is_ok());
    }
}
