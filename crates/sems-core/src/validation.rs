//! Declarative field constraints and the per-step validator.
//!
//! A [`FormDescriptor`] lists the fields of a step in presentation order.
//! [`StepValidator`] evaluates those descriptors against the live
//! [`FieldStore`], so conditional requirements always see current sibling
//! values.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::field_store::{FieldStore, FieldValue};

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Supported data kinds for wizard fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Secret,
    Integer,
    Decimal,
    Boolean,
    Choice(Vec<&'static str>),
}

impl FieldKind {
    /// Converts user input into a raw value of this kind. Choices are
    /// matched case-insensitively and stored by their canonical key.
    pub fn parse_input(&self, input: &str) -> Result<FieldValue, ValidationError> {
        let trimmed = input.trim();
        match self {
            FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(FieldValue::Flag(true)),
                "false" | "no" | "n" | "0" | "" => Ok(FieldValue::Flag(false)),
                _ => Err(ValidationError::new("Answer yes or no")),
            },
            FieldKind::Choice(options) => {
                if trimmed.is_empty() {
                    return Ok(FieldValue::choice(""));
                }
                options
                    .iter()
                    .find(|option| option.eq_ignore_ascii_case(trimmed))
                    .map(|option| FieldValue::choice(*option))
                    .ok_or_else(|| {
                        ValidationError::new(format!(
                            "Value must be one of: {}",
                            options.join(", ")
                        ))
                    })
            }
            _ => Ok(FieldValue::text(input)),
        }
    }

    fn check(&self, value: &FieldValue) -> Result<(), ValidationError> {
        let text = value.as_text().trim();
        match self {
            FieldKind::Text | FieldKind::Secret => Ok(()),
            FieldKind::Integer => text
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| ValidationError::new("Enter a whole number (e.g., 42)")),
            FieldKind::Decimal => parse_finite(text).map(|_| ()),
            FieldKind::Boolean => match value {
                FieldValue::Flag(_) => Ok(()),
                _ => self.parse_input(text).map(|_| ()),
            },
            FieldKind::Choice(options) => {
                if options.iter().any(|option| option.eq_ignore_ascii_case(text)) {
                    Ok(())
                } else {
                    Err(ValidationError::new(format!(
                        "Value must be one of: {}",
                        options.join(", ")
                    )))
                }
            }
        }
    }
}

/// Parses a decimal, refusing `NaN` and infinities.
fn parse_finite(text: &str) -> Result<f64, ValidationError> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::new("Enter a numeric value"))
}

/// When a field must carry a non-blank value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Always,
    Optional,
    /// Required while the sibling `field` currently equals `value`.
    WhenEquals {
        field: &'static str,
        value: &'static str,
    },
    /// Required unless the sibling `field` currently equals `value`.
    UnlessEquals {
        field: &'static str,
        value: &'static str,
    },
}

impl Requirement {
    pub fn applies(&self, store: &FieldStore) -> bool {
        let sibling_is = |field: &str, value: &str| {
            store
                .get(field)
                .map_or(false, |current| current.as_text().trim().eq_ignore_ascii_case(value))
        };
        match self {
            Requirement::Always => true,
            Requirement::Optional => false,
            Requirement::WhenEquals { field, value } => sibling_is(field, value),
            Requirement::UnlessEquals { field, value } => !sibling_is(field, value),
        }
    }
}

type ValidatorCallback = dyn Fn(&str, &FieldStore) -> Result<(), String> + Send + Sync;
type SharedValidatorCallback = Arc<ValidatorCallback>;

/// Built-in validation rules applied to non-blank values.
#[derive(Clone)]
pub enum Validator {
    MinLength(usize),
    MaxLength(usize),
    Pattern {
        regex: Regex,
        message: &'static str,
    },
    NumericRange {
        min: f64,
        max: f64,
    },
    /// Cross-field equality, e.g. password confirmation.
    EqualsField {
        field: &'static str,
        message: &'static str,
    },
    Custom(SharedValidatorCallback),
}

impl Validator {
    pub fn pattern(regex: &Regex, message: &'static str) -> Self {
        Validator::Pattern {
            regex: regex.clone(),
            message,
        }
    }

    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&str, &FieldStore) -> Result<(), String> + Send + Sync + 'static,
    {
        Validator::Custom(Arc::new(func))
    }

    fn validate(&self, input: &str, store: &FieldStore) -> Result<(), ValidationError> {
        match self {
            Validator::MinLength(min) => {
                if input.chars().count() < *min {
                    Err(ValidationError::new(format!(
                        "Must be at least {min} characters"
                    )))
                } else {
                    Ok(())
                }
            }
            Validator::MaxLength(max) => {
                if input.chars().count() > *max {
                    Err(ValidationError::new(format!(
                        "Must be at most {max} characters"
                    )))
                } else {
                    Ok(())
                }
            }
            Validator::Pattern { regex, message } => {
                if regex.is_match(input.trim()) {
                    Ok(())
                } else {
                    Err(ValidationError::new(*message))
                }
            }
            Validator::NumericRange { min, max } => parse_finite(input.trim())
                .and_then(|value| {
                    if value < *min || value > *max {
                        Err(ValidationError::new(format!(
                            "Must be between {min} and {max}"
                        )))
                    } else {
                        Ok(())
                    }
                }),
            Validator::EqualsField { field, message } => {
                let other = store.get(field).map(FieldValue::as_text).unwrap_or_default();
                if other == input {
                    Ok(())
                } else {
                    Err(ValidationError::new(*message))
                }
            }
            Validator::Custom(func) => func(input, store).map_err(ValidationError::new),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::MinLength(min) => write!(f, "MinLength({min})"),
            Validator::MaxLength(max) => write!(f, "MaxLength({max})"),
            Validator::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Validator::NumericRange { min, max } => write!(f, "NumericRange({min}..={max})"),
            Validator::EqualsField { field, .. } => write!(f, "EqualsField({field})"),
            Validator::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Declarative description of a single step field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub requirement: Requirement,
    pub help: Option<&'static str>,
    pub validators: Vec<Validator>,
}

impl FieldDescriptor {
    pub fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            requirement: Requirement::Always,
            help: None,
            validators: Vec::new(),
        }
    }

    pub fn with_optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }

    pub fn required_when(mut self, field: &'static str, value: &'static str) -> Self {
        self.requirement = Requirement::WhenEquals { field, value };
        self
    }

    pub fn required_unless(mut self, field: &'static str, value: &'static str) -> Self {
        self.requirement = Requirement::UnlessEquals { field, value };
        self
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Evaluates this field against the store. `Ok(())` when valid.
    pub fn validate(&self, store: &FieldStore) -> Result<(), ValidationError> {
        let value = match store.get(self.key).filter(|value| !value.is_blank()) {
            Some(value) => value,
            None if self.requirement.applies(store) => {
                return Err(ValidationError::new(format!("{} is required", self.label)));
            }
            None => return Ok(()),
        };

        self.kind.check(value)?;
        let input = value.as_text();
        for validator in &self.validators {
            validator.validate(input, store)?;
        }
        Ok(())
    }
}

/// Metadata describing a full step, including field order.
#[derive(Debug, Clone)]
pub struct FormDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl FormDescriptor {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.key == key)
    }
}

/// One failing field in a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub key: &'static str,
    pub label: &'static str,
    pub message: String,
}

/// Outcome of validating a step: every failing field with its message, in
/// form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<FieldIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn message_for(&self, key: &str) -> Option<&str> {
        self.issues
            .iter()
            .find(|issue| issue.key == key)
            .map(|issue| issue.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.key, issue.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Wraps a step's field store and its descriptor.
pub struct StepValidator<'a> {
    form: &'a FormDescriptor,
    store: &'a FieldStore,
}

impl<'a> StepValidator<'a> {
    pub fn new(form: &'a FormDescriptor, store: &'a FieldStore) -> Self {
        Self { form, store }
    }

    pub fn validate(&self) -> ValidationReport {
        let issues = self
            .form
            .fields
            .iter()
            .filter_map(|field| {
                field.validate(self.store).err().map(|err| FieldIssue {
                    key: field.key,
                    label: field.label,
                    message: err.message,
                })
            })
            .collect();
        ValidationReport { issues }
    }

    pub fn is_valid(&self) -> bool {
        self.form
            .fields
            .iter()
            .all(|field| field.validate(self.store).is_ok())
    }
}
