use carepoint_core::models::snapshot::FieldValue;

/// Raw numeric input classified three ways instead of collapsing
/// empty and invalid input into zero.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    Empty,
    Invalid(String),
    Value(f64),
}

impl NumericInput {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return NumericInput::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => NumericInput::Value(value),
            _ => NumericInput::Invalid(trimmed.to_string()),
        }
    }

    /// Invalid input is kept as text so the validator can flag it.
    pub fn into_field_value(self) -> FieldValue {
        match self {
            NumericInput::Empty => FieldValue::Empty,
            NumericInput::Invalid(raw) => FieldValue::Text(raw),
            NumericInput::Value(value) => FieldValue::Number(value),
        }
    }
}
