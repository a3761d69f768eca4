use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;

/// Closed set of colours a user may pick. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Red,
    Green,
    Blue,
}

impl Colour {
    pub const ALL: [Colour; 3] = [Colour::Red, Colour::Green, Colour::Blue];

    pub fn as_str(self) -> &'static str {
        match self {
            Colour::Red => "red",
            Colour::Green => "green",
            Colour::Blue => "blue",
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Colour {
    type Err = FieldErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Colour::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(FieldErrorKind::InvalidEnum)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldErrorKind {
    #[error("This field cannot be empty")]
    EmptyField,
    #[error("This field can only contain letters")]
    InvalidCharacters,
    #[error("value is not a valid email address")]
    InvalidEmail,
    #[error("Input should be 'red', 'green' or 'blue'")]
    InvalidEnum,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {kind}")]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
}

/// Every rule violation found in one submission, in field order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A submission that passed every field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub favourite_colour: Colour,
}

impl Submission {
    /// Checks all four fields and collects every violation.
    pub fn parse(
        first_name: &str,
        last_name: &str,
        email: &str,
        favourite_colour: &str,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let first_name = record(&mut errors, "first_name", parse_name(first_name));
        let last_name = record(&mut errors, "last_name", parse_name(last_name));
        let email = record(&mut errors, "email", parse_email(email));
        let favourite_colour = record(
            &mut errors,
            "favourite_colour",
            favourite_colour.parse::<Colour>(),
        );

        match (first_name, last_name, email, favourite_colour) {
            (Some(first_name), Some(last_name), Some(email), Some(favourite_colour)) => Ok(Self {
                first_name,
                last_name,
                email,
                favourite_colour,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

fn record<T>(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    result: Result<T, FieldErrorKind>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(kind) => {
            errors.push(FieldError { field, kind });
            None
        }
    }
}

/// Trimmed name made only of letters and spaces.
pub fn parse_name(raw: &str) -> Result<String, FieldErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::EmptyField);
    }
    lazy_static! {
        // General category L only: letter numbers and combining marks are rejected.
        static ref NAME_RE: Regex = Regex::new(r"^[\p{L} ]+$").unwrap();
    }
    if !NAME_RE.is_match(trimmed) {
        return Err(FieldErrorKind::InvalidCharacters);
    }
    Ok(trimmed.to_string())
}

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

/// Addr-spec with a dot-atom local part and a dotted domain of hostname labels.
pub fn parse_email(raw: &str) -> Result<String, FieldErrorKind> {
    let (local, domain) = raw.split_once('@').ok_or(FieldErrorKind::InvalidEmail)?;
    if raw.len() > MAX_EMAIL_LEN || !valid_local_part(local) || !valid_domain(domain) {
        return Err(FieldErrorKind::InvalidEmail);
    }
    Ok(raw.to_string())
}

fn valid_local_part(local: &str) -> bool {
    lazy_static! {
        static ref ATOM_RE: Regex =
            Regex::new(r"^[\p{L}\p{N}!#$%&'*+/=?^_`{|}~-]+$").unwrap();
    }
    local.len() <= MAX_LOCAL_LEN && local.split('.').all(|atom| ATOM_RE.is_match(atom))
}

fn valid_domain(domain: &str) -> bool {
    lazy_static! {
        static ref LABEL_RE: Regex =
            Regex::new(r"^[\p{L}\p{N}](?:[\p{L}\p{N}-]*[\p{L}\p{N}])?$").unwrap();
    }
    let labels: Vec<&str> = domain.split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };
    labels.len() >= 2
        && labels
            .iter()
            .all(|label| label.chars().count() <= MAX_LABEL_LEN && LABEL_RE.is_match(label))
        && !tld.chars().all(|c| c.is_ascii_digit())
}
