use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";

pub const EMAIL_MAX_LENGTH: usize = 255;
pub const NAME_MAX_LENGTH: usize = 255;
pub const PERSIAN_TITLE_MAX_LENGTH: usize = 255;
pub const DESCRIPTION_MAX_LENGTH: usize = 2000;

/// Collects field-level problems and turns them into one `ValidationError`.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        // first problem per field wins
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// `Some(None)` for absent or null, `None` once a type error is recorded
    fn string<'v>(&mut self, field: &str, value: Option<&'v Value>) -> Option<Option<&'v str>> {
        match value {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.as_str())),
            Some(_) => {
                self.add(field, NOT_A_STRING);
                None
            }
        }
    }

    /// Required, non-blank text within `max_len` characters. Returns the trimmed value.
    pub fn required_text(&mut self, field: &str, value: Option<&Value>, max_len: usize) -> Option<String> {
        match self.string(field, value)? {
            None => {
                self.add(field, REQUIRED);
                None
            }
            Some(v) => self.non_blank_text(field, v, max_len),
        }
    }

    /// Optional free text, blank allowed; absent or null becomes `""`
    pub fn optional_text(&mut self, field: &str, value: Option<&Value>, max_len: usize) -> Option<String> {
        let text = self.string(field, value)?.unwrap_or_default();
        self.max_length(field, text.trim(), max_len)
    }

    /// Present value that must not be blank
    pub fn non_blank_text(&mut self, field: &str, value: &str, max_len: usize) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, BLANK);
            return None;
        }
        self.max_length(field, trimmed, max_len)
    }

    pub fn max_length(&mut self, field: &str, value: &str, max_len: usize) -> Option<String> {
        if value.chars().count() > max_len {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max_len),
            );
            return None;
        }
        Some(value.to_string())
    }

    /// Validated, lowercased email
    pub fn email(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        let email = self.required_text(field, value, EMAIL_MAX_LENGTH)?;
        match validate_email_format(&email) {
            Ok(()) => Some(normalize_email(&email)),
            Err(msg) => {
                self.add(field, msg);
                None
            }
        }
    }

    /// Required password of at least `min_len` characters. Whitespace-only
    /// counts as blank; the value is otherwise kept verbatim.
    pub fn password(&mut self, field: &str, value: Option<&Value>, min_len: usize) -> Option<String> {
        let Some(password) = self.string(field, value)? else {
            self.add(field, REQUIRED);
            return None;
        };
        if password.trim().is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if password.chars().count() < min_len {
            self.add(
                field,
                format!("Ensure this field has at least {} characters.", min_len),
            );
            return None;
        }
        Some(password.to_string())
    }

    /// Optional primary key reference; absent or null yields `None` without an error
    pub fn uuid(&mut self, field: &str, value: Option<&Value>) -> Option<Uuid> {
        let raw = self.string(field, value).flatten()?;
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                self.add(field, format!("\"{}\" is not a valid UUID.", raw));
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Invalid input", Some(self.errors)))
        }
    }
}

/// Emails are stored and compared in lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email validation: one `@`, non-empty local part, dotted domain
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    if email.chars().any(char::is_whitespace) {
        return Err("Enter a valid email address.".to_string());
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err("Enter a valid email address.".to_string());
    }

    let domain = parts[1];
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Enter a valid email address.".to_string());
    }

    Ok(())
}
