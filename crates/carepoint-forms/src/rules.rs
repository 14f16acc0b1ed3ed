use std::collections::BTreeMap;
use std::fmt;

use jiff::civil::Date;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use carepoint_core::age::age_on;
use carepoint_core::models::form::SectionKey;
use carepoint_core::models::snapshot::{FieldValue, FormSnapshot};

use crate::numeric::NumericInput;

/// The input control a field is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    /// A single pick from a fixed option list.
    Choice,
    Flag,
    List,
}

/// A compiled pattern plus the message shown when it does not match.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    message: &'static str,
}

impl Pattern {
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex. Patterns are compile-time
    /// constants in the form definitions, so a panic is a definition bug.
    pub fn new(pattern: &str, message: &'static str) -> Self {
        let regex =
            Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern '{pattern}': {e}"));
        Self { regex, message }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Declarative per-field rule. Rules that do not apply to a field's kind
/// are ignored.
#[derive(Debug, Clone)]
pub enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Range { min: f64, max: f64 },
    WholeNumber,
    Pattern(Pattern),
    OneOf(&'static [&'static str]),
    /// Compared against the validation context's `today`.
    DateNotInPast,
    DateNotInFuture,
    /// Age on `today` computed from a date of birth.
    AgeBetween { min: u32, max: u32 },
    MinItems(usize),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub path: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn required(path: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            path,
            label,
            kind,
            required: true,
            rules: Vec::new(),
        }
    }

    pub fn optional(path: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(path, label, kind)
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// An ordered group of fields shown together.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub key: SectionKey,
    pub title: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// Inputs that validation may depend on besides the snapshot itself.
///
/// Build a fresh one for every validation pass; date rules read `today`
/// from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub today: Date,
}

impl ValidationContext {
    /// Reads the local wall clock.
    pub fn now() -> Self {
        Self {
            today: jiff::Zoned::now().date(),
        }
    }

    pub fn at(today: Date) -> Self {
        Self { today }
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationResult {
    pub field_path: String,
    pub is_valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok(path: &str) -> Self {
        Self {
            field_path: path.to_string(),
            is_valid: true,
            message: None,
        }
    }

    pub fn fail(path: &str, message: impl Into<String>) -> Self {
        Self {
            field_path: path.to_string(),
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Field-indexed failures from a full validation pass. The first failure
/// per field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn push(&mut self, result: ValidationResult) {
        if result.is_valid {
            return;
        }
        let message = result
            .message
            .unwrap_or_else(|| "invalid value".to_string());
        self.fields.entry(result.field_path).or_insert(message);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }
}

impl FromIterator<ValidationResult> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationResult>>(iter: I) -> Self {
        let mut errors = ValidationErrors::default();
        for result in iter {
            errors.push(result);
        }
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) invalid", self.fields.len())?;
        for (i, (path, message)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{path}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check one field's value against its kind and rules.
pub fn check_field(
    spec: &FieldSpec,
    snapshot: &FormSnapshot,
    ctx: &ValidationContext,
) -> ValidationResult {
    let path = spec.path;
    let label = spec.label;

    let value = match snapshot.get(path) {
        Some(value) if !value.is_absent() => value,
        _ if spec.required => return ValidationResult::fail(path, format!("{label} is required")),
        _ => return ValidationResult::ok(path),
    };

    match (spec.kind, value) {
        (FieldKind::Text | FieldKind::Choice, FieldValue::Text(text)) => {
            check_text(spec, text.trim())
        }
        (FieldKind::Number, FieldValue::Number(n)) => check_number(spec, *n),
        (FieldKind::Number, FieldValue::Text(raw)) => match NumericInput::parse(raw) {
            NumericInput::Value(n) => check_number(spec, n),
            NumericInput::Empty | NumericInput::Invalid(_) => {
                ValidationResult::fail(path, format!("{label} must be a number"))
            }
        },
        (FieldKind::Date, FieldValue::Date(date)) => check_date(spec, *date, ctx),
        (FieldKind::Date, FieldValue::Text(_)) => {
            ValidationResult::fail(path, format!("{label} must be a date (YYYY-MM-DD)"))
        }
        (FieldKind::Flag, FieldValue::Bool(_)) => ValidationResult::ok(path),
        (FieldKind::List, FieldValue::List(items)) => check_list(spec, items),
        (kind, other) => ValidationResult::fail(
            path,
            format!(
                "{label} must be {}, got {}",
                expected_name(kind),
                other.kind_name()
            ),
        ),
    }
}

fn expected_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Choice => "text",
        FieldKind::Number => "a number",
        FieldKind::Date => "a date",
        FieldKind::Flag => "a flag",
        FieldKind::List => "a list",
    }
}

fn check_text(spec: &FieldSpec, text: &str) -> ValidationResult {
    let (path, label) = (spec.path, spec.label);
    let len = text.chars().count();
    for rule in &spec.rules {
        match rule {
            Rule::MinLength(min) if len < *min => {
                return ValidationResult::fail(
                    path,
                    format!("{label} must be at least {min} characters"),
                );
            }
            Rule::MaxLength(max) if len > *max => {
                return ValidationResult::fail(
                    path,
                    format!("{label} must be at most {max} characters"),
                );
            }
            Rule::Pattern(pattern) if !pattern.is_match(text) => {
                return ValidationResult::fail(path, format!("{label} {}", pattern.message));
            }
            Rule::OneOf(options) if !options.contains(&text) => {
                return ValidationResult::fail(
                    path,
                    format!("{label} must be one of: {}", options.join(", ")),
                );
            }
            _ => {}
        }
    }
    ValidationResult::ok(path)
}

fn check_number(spec: &FieldSpec, value: f64) -> ValidationResult {
    let (path, label) = (spec.path, spec.label);
    if !value.is_finite() {
        return ValidationResult::fail(path, format!("{label} must be a number"));
    }
    for rule in &spec.rules {
        match rule {
            Rule::Range { min, max } if value < *min || value > *max => {
                return ValidationResult::fail(
                    path,
                    format!("{label} must be between {min} and {max}"),
                );
            }
            Rule::WholeNumber if value.fract() != 0.0 => {
                return ValidationResult::fail(path, format!("{label} must be a whole number"));
            }
            _ => {}
        }
    }
    ValidationResult::ok(path)
}

fn check_date(spec: &FieldSpec, date: Date, ctx: &ValidationContext) -> ValidationResult {
    let (path, label) = (spec.path, spec.label);
    for rule in &spec.rules {
        match rule {
            Rule::DateNotInPast if date < ctx.today => {
                return ValidationResult::fail(path, format!("{label} cannot be in the past"));
            }
            Rule::DateNotInFuture if date > ctx.today => {
                return ValidationResult::fail(path, format!("{label} cannot be in the future"));
            }
            Rule::AgeBetween { min, max } => {
                let in_range = age_on(date, ctx.today).is_some_and(|age| age >= *min && age <= *max);
                if !in_range {
                    return ValidationResult::fail(
                        path,
                        format!("age from {label} must be between {min} and {max} years"),
                    );
                }
            }
            _ => {}
        }
    }
    ValidationResult::ok(path)
}

fn check_list(spec: &FieldSpec, items: &[String]) -> ValidationResult {
    for rule in &spec.rules {
        if let Rule::MinItems(min) = rule
            && items.len() < *min
        {
            return ValidationResult::fail(
                spec.path,
                format!("{} needs at least {min} entr{}", spec.label, if *min == 1 { "y" } else { "ies" }),
            );
        }
    }
    ValidationResult::ok(spec.path)
}
