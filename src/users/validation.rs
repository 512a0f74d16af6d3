use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::users::dto::CreateUserDto;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "is required"),
            Rule::MinLength(n) => write!(f, "must be at least {n} characters"),
            Rule::MaxLength(n) => write!(f, "must be at most {n} characters"),
            Rule::Email => write!(f, "must be a valid email address"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {rule}")]
pub struct ValidationError {
    pub field: &'static str,
    pub rule: Rule,
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    let rule = if len == 0 {
        Rule::Required
    } else if len < min {
        Rule::MinLength(min)
    } else if len > max {
        Rule::MaxLength(max)
    } else {
        return Ok(());
    };
    Err(ValidationError { field, rule })
}

/// Structural checks on create input. Stops at the first violated rule.
pub fn validate_create(input: &CreateUserDto) -> Result<(), ValidationError> {
    check_len("firstname", &input.firstname, 2, 32)?;
    check_len("lastname", &input.lastname, 2, 32)?;
    check_len("email", &input.email, 1, 128)?;
    if !is_valid_email(&input.email) {
        return Err(ValidationError {
            field: "email",
            rule: Rule::Email,
        });
    }
    check_len("password", &input.password, 8, 32)?;
    Ok(())
}
