//! Field-level input checks shared by the services.
//!
//! Per-field rules are declared on the request types with `#[derive(Validate)]`;
//! the services add the checks that need the database (uniqueness, existence,
//! ownership) on top before turning the result into a 422.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Messages keyed by the name of the offending field, ready for a form to display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, Error)]
#[error("validation failed for: {}", .fields.keys().cloned().collect::<Vec<_>>().join(", "))]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Run the derived rules of `data`, collecting every failing field.
    pub fn of(data: &impl Validate) -> Self {
        data.validate().err().map(Self::from).unwrap_or_default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.add(field, message);
        }
        self
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Self::default();
        for (field, field_errors) in errors.field_errors() {
            let field: &str = &field;
            for error in field_errors {
                out.add(field, describe(field, error));
            }
        }
        out
    }
}

/// Form message for a failed rule; an explicit `message` on the rule wins.
fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let label = field.replace('_', " ");
    let param = |name: &str| error.params.get(name).map(display_param);
    match &*error.code {
        "length" if matches!(error.params.get("value"), Some(Value::String(s)) if s.is_empty()) => {
            format!("The {} field is required.", label)
        }
        "length" => match param("max") {
            Some(max) => format!("The {} may not be greater than {} characters.", label, max),
            None => format!("The {} is too short.", label),
        },
        "required" => format!("The {} field is required.", label),
        "email" => format!("The {} must be a valid email address.", label),
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("The {} must be between {} and {}.", label, min, max),
            (Some(min), None) => format!("The {} must be at least {}.", label, min),
            (None, Some(max)) => format!("The {} may not be greater than {}.", label, max),
            (None, None) => format!("The {} is out of range.", label),
        },
        "non_negative" => format!("The {} must be a positive number.", label),
        "non_zero" => format!("The {} must not be zero.", label),
        _ => format!("The {} is invalid.", label),
    }
}

fn display_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Trim a required text input.
pub fn clean(value: &str) -> String {
    value.trim().to_string()
}

/// Trim an optional text input, treating blank as absent.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct MechanicForm {
        #[validate(length(min = 1, max = 100))]
        first_name: String,
        #[validate(email)]
        email: String,
        #[validate(range(min = 0))]
        hourly_rate_cents: i64,
        #[validate(length(max = 10))]
        phone: Option<String>,
        #[validate(custom(function = "db::validation::non_negative_hours"))]
        labor_hours: f64,
    }

    fn valid_form() -> MechanicForm {
        MechanicForm {
            first_name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            hourly_rate_cents: 6_000,
            phone: None,
            labor_hours: 1.5,
        }
    }

    #[test]
    fn test_collects_every_failing_field() {
        let errors = ValidationErrors::of(&MechanicForm {
            first_name: String::new(),
            email: "not-an-email".to_string(),
            hourly_rate_cents: -1,
            ..valid_form()
        });

        assert_eq!(
            errors.field_names(),
            vec!["email", "first_name", "hourly_rate_cents"]
        );
        assert_eq!(
            errors.fields["first_name"],
            vec!["The first name field is required.".to_string()]
        );
        assert_eq!(
            errors.fields["email"],
            vec!["The email must be a valid email address.".to_string()]
        );
    }

    #[test]
    fn test_passes_valid_input() {
        assert!(ValidationErrors::of(&valid_form()).into_result().is_ok());
    }

    #[test]
    fn test_optional_field_is_checked_when_present() {
        let errors = ValidationErrors::of(&MechanicForm {
            phone: Some("555-0100-0000".to_string()),
            ..valid_form()
        });
        assert_eq!(
            errors.fields["phone"],
            vec!["The phone may not be greater than 10 characters.".to_string()]
        );
    }

    #[test]
    fn test_rejects_nan_hours() {
        let errors = ValidationErrors::of(&MechanicForm {
            labor_hours: f64::NAN,
            ..valid_form()
        });
        assert_eq!(
            errors.fields["labor_hours"],
            vec!["The labor hours must be a positive number.".to_string()]
        );
    }

    #[test]
    fn test_database_checks_merge_with_field_rules() {
        let mut errors = ValidationErrors::of(&MechanicForm {
            hourly_rate_cents: -5,
            ..valid_form()
        });
        errors
            .check("email", false, "The email has already been taken.")
            .check("first_name", true, "unused");

        assert_eq!(errors.field_names(), vec!["email", "hourly_rate_cents"]);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_clean_optional_drops_blank() {
        assert_eq!(clean_optional(Some("   ".to_string())), None);
        assert_eq!(clean_optional(Some(" 555-0100 ".to_string())), Some("555-0100".to_string()));
        assert_eq!(clean_optional(None), None);
    }
}
