use carepoint_core::models::form::FormType;
use carepoint_core::models::snapshot::{FieldValue, FormSnapshot};
use carepoint_forms::definition;
use carepoint_forms::forms::billing;
use carepoint_forms::numeric::NumericInput;
use carepoint_forms::rules::ValidationContext;
use jiff::civil::date;

#[test]
fn blank_input_is_empty_not_zero() {
    assert_eq!(NumericInput::parse(""), NumericInput::Empty);
    assert_eq!(NumericInput::parse("   "), NumericInput::Empty);
    assert_eq!(NumericInput::parse("").into_field_value(), FieldValue::Empty);
}

#[test]
fn garbage_is_invalid_and_kept() {
    assert_eq!(
        NumericInput::parse(" 12abc "),
        NumericInput::Invalid("12abc".to_string())
    );
    assert_eq!(
        NumericInput::parse("NaN"),
        NumericInput::Invalid("NaN".to_string())
    );
    assert_eq!(
        NumericInput::parse("12abc").into_field_value(),
        FieldValue::Text("12abc".to_string())
    );
}

#[test]
fn numbers_parse_including_zero() {
    assert_eq!(NumericInput::parse("0"), NumericInput::Value(0.0));
    assert_eq!(NumericInput::parse("37.5"), NumericInput::Value(37.5));
    assert_eq!(
        NumericInput::parse("-4").into_field_value(),
        FieldValue::Number(-4.0)
    );
}

#[test]
fn non_finite_numbers_are_rejected() {
    let def = definition(FormType::OpdVisit);
    let ctx = ValidationContext::at(date(2024, 1, 1));
    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let mut s = FormSnapshot::new();
        s.set(billing::CONSULTATION_FEE, value);
        let result = def.validate_field(billing::CONSULTATION_FEE, &s, &ctx);
        assert!(!result.is_valid, "{value} accepted");
        assert_eq!(
            result.message.as_deref(),
            Some("Consultation fee must be a number")
        );
    }
}
