//! Field-level input validation producing `{field: [messages]}` maps.

use std::collections::BTreeMap;

use serde::Serialize;

use parley_types::api::TextInput;

use crate::error::ApiError;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MAX_LEN: usize = 128;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    /// Like [`FieldErrors::into_result`], but wrapped in the
    /// `{status: failure, detail}` envelope.
    pub fn into_failure(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.failure())
        }
    }

    pub fn failure(self) -> ApiError {
        match serde_json::to_value(&self) {
            Ok(detail) => ApiError::Failure(detail),
            Err(e) => ApiError::Internal(e.into()),
        }
    }
}

/// Checks presence, type and non-blankness. Returns the value with
/// surrounding whitespace trimmed, only when all three hold.
pub fn required<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a TextInput>,
) -> Option<&'a str> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    let Some(text) = value.as_text() else {
        errors.add(field, NOT_A_STRING);
        return None;
    };
    match text.trim() {
        "" => {
            errors.add(field, BLANK);
            None
        }
        trimmed => Some(trimmed),
    }
}

pub fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
        return false;
    }
    true
}

/// Letters, digits and `@ . + - _` only.
pub fn username(errors: &mut FieldErrors, value: &str) {
    if !max_length(errors, "username", value, USERNAME_MAX_LEN) {
        return;
    }
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub fn email(errors: &mut FieldErrors, value: &str) {
    if !max_length(errors, "email", value, EMAIL_MAX_LEN) {
        return;
    }
    if !looks_like_email(value) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels
            .iter()
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_distinguishes_missing_blank_and_invalid() {
        let blank = TextInput::from("  ");
        let email = TextInput::from("a@b.io");
        let mut errors = FieldErrors::new();
        assert_eq!(required(&mut errors, "text", None), None);
        assert_eq!(required(&mut errors, "user", Some(&blank)), None);
        assert_eq!(required(&mut errors, "refresh", Some(&TextInput::Invalid)), None);
        assert_eq!(required(&mut errors, "email", Some(&email)), Some("a@b.io"));

        assert_eq!(errors.get("text"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("user"), Some(&[BLANK.to_string()][..]));
        assert_eq!(errors.get("refresh"), Some(&[NOT_A_STRING.to_string()][..]));
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn required_trims_surrounding_whitespace() {
        let padded = TextInput::from("\t  padded text \n");
        let mut errors = FieldErrors::new();
        assert_eq!(required(&mut errors, "text", Some(&padded)), Some("padded text"));
        assert!(errors.is_empty());
    }

    #[test]
    fn username_charset() {
        let mut errors = FieldErrors::new();
        username(&mut errors, "alice.b+test@home_1-x");
        assert!(errors.is_empty());

        username(&mut errors, "alice smith");
        username(&mut errors, "bob!");
        assert_eq!(errors.get("username").map(<[String]>::len), Some(2));
    }

    #[test]
    fn username_length_cap() {
        let mut errors = FieldErrors::new();
        username(&mut errors, &"a".repeat(USERNAME_MAX_LEN));
        assert!(errors.is_empty());
        username(&mut errors, &"a".repeat(USERNAME_MAX_LEN + 1));
        assert_eq!(
            errors.get("username").unwrap()[0],
            "Ensure this field has no more than 150 characters."
        );
    }

    #[test]
    fn email_shapes() {
        for ok in ["alice@example.com", "a.b+c@mail.example.org"] {
            assert!(looks_like_email(ok), "{ok}");
        }
        for bad in ["alice", "alice@", "@example.com", "alice@example", "a b@example.com", "a@-x.com"] {
            assert!(!looks_like_email(bad), "{bad}");
        }
    }

    #[test]
    fn errors_serialize_as_field_map() {
        let mut errors = FieldErrors::single("username", "taken");
        errors.add("username", "too long");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "username": ["taken", "too long"] })
        );
        assert!(matches!(errors.into_result(), Err(ApiError::Validation(_))));
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
