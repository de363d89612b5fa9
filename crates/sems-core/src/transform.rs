//! Helpers for mapping raw field stores into backend payload fragments.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::field_store::FieldStore;

/// Backend-shaped subset of the registration request produced by one step.
pub type PayloadFragment = Map<String, Value>;

/// Pure mapping from a step's raw values to its payload fragment.
pub type StepTransformer = fn(&FieldStore) -> Result<PayloadFragment, TransformError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Missing value for `{0}`")]
    MissingField(String),
    #[error("Invalid value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },
}

impl TransformError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        TransformError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub fn required_text(store: &FieldStore, key: &str) -> Result<Value, TransformError> {
    store
        .text(key)
        .map(|value| Value::String(value.to_string()))
        .ok_or_else(|| TransformError::MissingField(key.to_string()))
}

/// Secret text exactly as entered; surrounding whitespace is significant.
pub fn required_secret(store: &FieldStore, key: &str) -> Result<Value, TransformError> {
    store
        .get(key)
        .filter(|value| !value.is_blank())
        .map(|value| Value::String(value.as_text().to_string()))
        .ok_or_else(|| TransformError::MissingField(key.to_string()))
}

/// Trimmed text, or `null` when blank.
pub fn text_or_null(store: &FieldStore, key: &str) -> Value {
    store
        .text(key)
        .map_or(Value::Null, |value| Value::String(value.to_string()))
}

/// Decimal number, or `null` when blank.
pub fn decimal_or_null(store: &FieldStore, key: &str) -> Result<Value, TransformError> {
    let Some(raw) = store.text(key) else {
        return Ok(Value::Null);
    };
    let parsed = raw
        .parse::<f64>()
        .map_err(|_| TransformError::invalid(key, format!("`{raw}` is not a number")))?;
    serde_json::Number::from_f64(parsed)
        .map(Value::Number)
        .ok_or_else(|| TransformError::invalid(key, "number is not finite"))
}

/// Converts a kWh figure entered by the user into whole watt-hours.
pub fn kwh_to_wh(store: &FieldStore, key: &str) -> Result<Value, TransformError> {
    let Some(raw) = store.text(key) else {
        return Ok(Value::Null);
    };
    let kwh = raw
        .parse::<f64>()
        .map_err(|_| TransformError::invalid(key, format!("`{raw}` is not a number")))?;
    if !kwh.is_finite() || kwh < 0.0 {
        return Err(TransformError::invalid(key, "consumption must be zero or positive"));
    }
    Ok(Value::from((kwh * 1000.0).round() as u64))
}

/// Maps a UI choice key to its backend value using `table`.
pub fn remap_choice(
    store: &FieldStore,
    key: &str,
    table: &[(&str, &str)],
) -> Result<Value, TransformError> {
    let raw = store
        .text(key)
        .ok_or_else(|| TransformError::MissingField(key.to_string()))?;
    table
        .iter()
        .find(|(ui, _)| ui.eq_ignore_ascii_case(raw))
        .map(|(_, backend)| Value::String((*backend).to_string()))
        .ok_or_else(|| TransformError::invalid(key, format!("`{raw}` has no backend mapping")))
}

/// Builds a nested object from `(payload_key, value)` pairs.
pub fn object(entries: Vec<(&str, Value)>) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_store::FieldValue;
    use serde_json::json;

    #[test]
    fn kwh_strings_become_watt_hour_numbers() {
        let store = FieldStore::new()
            .with("annual_consumption", FieldValue::text("1200"))
            .with("gas_annual_consumption", FieldValue::text("2.5"));

        assert_eq!(kwh_to_wh(&store, "annual_consumption").unwrap(), json!(1_200_000));
        assert_eq!(kwh_to_wh(&store, "gas_annual_consumption").unwrap(), json!(2_500));
        assert_eq!(kwh_to_wh(&store, "missing").unwrap(), Value::Null);
    }

    #[test]
    fn secrets_keep_surrounding_whitespace() {
        let store = FieldStore::new()
            .with("password", FieldValue::text("  pass12 "))
            .with("blank", FieldValue::text("   "));

        assert_eq!(required_secret(&store, "password").unwrap(), json!("  pass12 "));
        assert_eq!(
            required_secret(&store, "blank"),
            Err(TransformError::MissingField("blank".into()))
        );
    }

    #[test]
    fn negative_consumption_is_rejected() {
        let store = FieldStore::new().with("annual_consumption", FieldValue::text("-1"));
        assert!(matches!(
            kwh_to_wh(&store, "annual_consumption"),
            Err(TransformError::InvalidValue { .. })
        ));
    }

    #[test]
    fn remap_choice_uses_table() {
        let store = FieldStore::new().with("governance_type", FieldValue::choice("maintained"));
        let table = [("academy", "academy"), ("maintained", "local_authority")];
        assert_eq!(
            remap_choice(&store, "governance_type", &table).unwrap(),
            json!("local_authority")
        );
        let unmapped = FieldStore::new().with("governance_type", FieldValue::choice("charter"));
        assert!(remap_choice(&unmapped, "governance_type", &table).is_err());
    }
}
