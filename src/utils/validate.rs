use crate::utils::error::AppError;
use std::collections::HashSet;

pub const QUESTION_MIN_LEN: usize = 5;
pub const QUESTION_MAX_LEN: usize = 500;
pub const OPTION_MAX_LEN: usize = 200;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;

pub const CHART_TYPES: [&str; 3] = ["bar", "pie", "doughnut"];

/// Poll text is restricted to a conservative charset; everything else is
/// rejected rather than escaped.
fn is_allowed_text(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?' | '\'' | '-')
    })
}

pub fn validate_question(raw: &str) -> Result<String, AppError> {
    let question = raw.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question is required".to_string()));
    }
    let len = question.chars().count();
    if !(QUESTION_MIN_LEN..=QUESTION_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(
            "Question must be between 5 and 500 characters".to_string(),
        ));
    }
    if !is_allowed_text(question) {
        return Err(AppError::Validation("Question contains invalid characters".to_string()));
    }
    Ok(question.to_string())
}

/// Trims and drops empty entries, then enforces count, length, charset and
/// case-insensitive uniqueness. Returns the cleaned texts in input order.
pub fn validate_options(raw: &[String]) -> Result<Vec<String>, AppError> {
    if raw.len() > MAX_OPTIONS {
        return Err(AppError::Validation("Maximum 10 options allowed".to_string()));
    }
    let cleaned: Vec<String> = raw
        .iter()
        .map(|opt| opt.trim().to_string())
        .filter(|opt| !opt.is_empty())
        .collect();
    if cleaned.len() < MIN_OPTIONS {
        return Err(AppError::Validation(
            "At least 2 non-empty options are required".to_string(),
        ));
    }
    for opt in &cleaned {
        if opt.chars().count() > OPTION_MAX_LEN {
            return Err(AppError::Validation(
                "Each option must be between 1 and 200 characters".to_string(),
            ));
        }
        if !is_allowed_text(opt) {
            return Err(AppError::Validation("Option contains invalid characters".to_string()));
        }
    }
    let mut seen = HashSet::new();
    for opt in &cleaned {
        if !seen.insert(opt.to_lowercase()) {
            return Err(AppError::Validation("Duplicate options are not allowed".to_string()));
        }
    }
    Ok(cleaned)
}

pub fn validate_chart_type(raw: &str) -> Result<String, AppError> {
    let chart_type = raw.trim().to_lowercase();
    if !CHART_TYPES.contains(&chart_type.as_str()) {
        return Err(AppError::Validation(
            "Chart type must be one of: bar, pie, doughnut".to_string(),
        ));
    }
    Ok(chart_type)
}

/// Normalizes to lowercase and checks the rough shape; real verification is
/// the unique index plus whatever mail the user can actually receive.
pub fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("Please provide a valid email".to_string()));
    }
    Ok(email)
}

pub fn validate_password(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("Password must contain a number".to_string()));
    }
    Ok(())
}

pub fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(
            "Name must be between 2 and 50 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}
