use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required(String),
    TooShort { field: String, min: usize, actual: usize },
    TooLong { field: String, max: usize, actual: usize },
    InvalidFormat { field: String, expected: String },
    InvalidRange { field: String, min: String, max: String },
    InvalidEmail(String),
    InvalidUrl(String),
    InvalidPhone(String),
    Custom(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "Field '{}' is required", field),
            Self::TooShort { field, min, actual } => {
                write!(f, "Field '{}' is too short: {} < {} chars", field, actual, min)
            }
            Self::TooLong { field, max, actual } => {
                write!(f, "Field '{}' is too long: {} > {} chars", field, actual, max)
            }
            Self::InvalidFormat { field, expected } => {
                write!(f, "Field '{}' has invalid format, expected: {}", field, expected)
            }
            Self::InvalidRange { field, min, max } => {
                write!(f, "Field '{}' must be between {} and {}", field, min, max)
            }
            Self::InvalidEmail(email) => write!(f, "Invalid email address: {}", email),
            Self::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            Self::InvalidPhone(phone) => write!(f, "Invalid phone number: {}", phone),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn to_error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    /// All messages joined into one line, for notifications and error bodies.
    pub fn summary(&self) -> String {
        self.to_error_messages().join("; ")
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Shape checks a record input must pass before it reaches the store.
///
/// The same implementation runs in the API handlers and in the client
/// before a form is submitted.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationResult>;
}

/// Widest email, website and phone columns in the schema.
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_URL_LEN: usize = 255;
pub const MAX_PHONE_LEN: usize = 20;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+(/[-a-zA-Z0-9()@:%_\+.~#?&/=]*)?$"
    ).expect("Invalid URL regex")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9]\d{5,19}$").expect("Invalid phone regex")
});

static USERNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_.-]{2,49}$").expect("Invalid username regex")
});

pub fn validate_string_required(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field_name.to_string()))
    } else {
        Ok(())
    }
}

pub fn validate_length(
    value: &str,
    field_name: &str,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let len = value.chars().count();

    if let Some(min_len) = min {
        if len < min_len {
            return Err(ValidationError::TooShort {
                field: field_name.to_string(),
                min: min_len,
                actual: len,
            });
        }
    }

    if let Some(max_len) = max {
        if len > max_len {
            return Err(ValidationError::TooLong {
                field: field_name.to_string(),
                max: max_len,
                actual: len,
            });
        }
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.chars().count() > MAX_URL_LEN {
        return Err(ValidationError::InvalidUrl(url.to_string()));
    }

    if URL_REGEX.is_match(url) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl(url.to_string()))
    }
}

/// Separators are allowed but count towards the stored length.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(ValidationError::InvalidPhone(phone.to_string()));
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();

    if PHONE_REGEX.is_match(&digits) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone(phone.to_string()))
    }
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            expected: "3-50 chars, starting with a letter, alphanumeric with _ . and -".to_string(),
        })
    }
}

pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    field_name: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), ValidationError> {
    let min_str = min.as_ref().map(|m| m.to_string()).unwrap_or_else(|| "-∞".to_string());
    let max_str = max.as_ref().map(|m| m.to_string()).unwrap_or_else(|| "∞".to_string());

    let below = min.as_ref().is_some_and(|m| value < *m);
    let above = max.as_ref().is_some_and(|m| value > *m);

    if below || above {
        return Err(ValidationError::InvalidRange {
            field: field_name.to_string(),
            min: min_str,
            max: max_str,
        });
    }

    Ok(())
}

/// Chainable collector; every check records its error and keeps going so a
/// form can show all problems at once.
pub struct Validator {
    result: ValidationResult,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    fn record(mut self, outcome: Result<(), ValidationError>) -> Self {
        if let Err(e) = outcome {
            self.result.add_error(e);
        }
        self
    }

    pub fn string_required(self, value: &str, field_name: &str) -> Self {
        self.record(validate_string_required(value, field_name))
    }

    pub fn length(self, value: &str, field_name: &str, min: Option<usize>, max: Option<usize>) -> Self {
        self.record(validate_length(value, field_name, min, max))
    }

    /// Required and at most `max` characters.
    pub fn text(self, value: &str, field_name: &str, max: usize) -> Self {
        match validate_string_required(value, field_name) {
            Ok(()) => self.length(value, field_name, None, Some(max)),
            Err(e) => self.record(Err(e)),
        }
    }

    pub fn optional_text(self, value: Option<&str>, field_name: &str, max: usize) -> Self {
        match value {
            Some(v) => self.length(v, field_name, None, Some(max)),
            None => self,
        }
    }

    pub fn email(self, value: &str) -> Self {
        self.record(validate_email(value))
    }

    pub fn optional_email(self, value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.email(v),
            None => self,
        }
    }

    pub fn optional_url(self, value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.record(validate_url(v)),
            None => self,
        }
    }

    pub fn optional_phone(self, value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.record(validate_phone(v)),
            None => self,
        }
    }

    pub fn username(self, value: &str) -> Self {
        self.record(validate_username(value))
    }

    pub fn range<T: PartialOrd + std::fmt::Display>(
        self,
        value: T,
        field_name: &str,
        min: Option<T>,
        max: Option<T>,
    ) -> Self {
        self.record(validate_range(value, field_name, min, max))
    }

    pub fn optional_range<T: PartialOrd + std::fmt::Display>(
        self,
        value: Option<T>,
        field_name: &str,
        min: Option<T>,
        max: Option<T>,
    ) -> Self {
        match value {
            Some(v) => self.range(v, field_name, min, max),
            None => self,
        }
    }

    pub fn custom<F>(mut self, validation_fn: F) -> Self
    where
        F: FnOnce() -> Option<ValidationError>,
    {
        if let Some(error) = validation_fn() {
            self.result.add_error(error);
        }
        self
    }

    pub fn validate(self) -> Result<(), ValidationResult> {
        if self.result.is_valid() {
            Ok(())
        } else {
            Err(self.result)
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
