//! Validation rules shared by every import kind.
//!
//! Rules accumulate into a [`Violations`] list; nothing short-circuits, so one row reports all
//! of its problems at once.

use std::fmt::Display;

use super::parse::Coerced;

/// Ordered list of violation messages for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    /// Required text field must be present and non-blank.
    pub fn required(&mut self, field: &str, value: Option<&str>) {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.push(format!("{field} is required"));
        }
    }

    /// Required email field: present and well-formed.
    pub fn required_email(&mut self, field: &str, value: Option<&str>) {
        match value {
            None => self.push(format!("{field} is required")),
            Some(v) => self.email(field, Some(v)),
        }
    }

    /// Optional email field: well-formed when present.
    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_valid_email(v) {
                self.push(format!("{field} '{v}' is not a valid email address"));
            }
        }
    }

    /// Required typed field: present and parseable.
    pub fn required_coerced<T>(&mut self, field: &str, value: &Coerced<T>, expected: &str) {
        match value {
            Coerced::Empty => self.push(format!("{field} is required")),
            Coerced::Invalid { raw } => {
                self.push(format!("{field} '{raw}' is not a valid {expected}"))
            }
            Coerced::Value(_) => {}
        }
    }

    /// Optional typed field: reported only under strict parsing, otherwise silently dropped.
    pub fn optional_coerced<T>(
        &mut self,
        strict: bool,
        field: &str,
        value: &Coerced<T>,
        expected: &str,
    ) {
        if let (true, Some(raw)) = (strict, value.invalid_raw()) {
            self.push(format!("{field} '{raw}' is not a valid {expected}"));
        }
    }

    pub fn positive(&mut self, field: &str, value: Option<i64>) {
        if let Some(v) = value {
            if v <= 0 {
                self.push(format!("{field} must be a positive number"));
            }
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if let Some(v) = value {
            if v < 0.0 {
                self.push(format!("{field} must not be negative"));
            }
        }
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_plausible_phone(v) {
                self.push(format!("{field} '{v}' is not a valid phone number"));
            }
        }
    }

    /// `earlier` must fall strictly before `later` when both are present.
    pub fn before<T: PartialOrd + Display>(
        &mut self,
        earlier_field: &str,
        earlier: Option<T>,
        later_field: &str,
        later: Option<T>,
    ) {
        if let (Some(a), Some(b)) = (earlier, later) {
            if a >= b {
                self.push(format!("{earlier_field} ({a}) must be before {later_field} ({b})"));
            }
        }
    }
}

/// Lax mailbox check: parse the input, re-render the address, and require it to equal the input.
///
/// Accepts `local@domain`. Display-name forms (`Ada <ada@example.org>`) parse but do not round
/// trip, so they are rejected like any other non-canonical spelling.
pub fn is_valid_email(input: &str) -> bool {
    match parse_mailbox(input) {
        Some(address) => address == input,
        None => false,
    }
}

fn parse_mailbox(input: &str) -> Option<String> {
    let input = input.trim();
    let address = match (input.rfind('<'), input.ends_with('>')) {
        (Some(open), true) => &input[open + 1..input.len() - 1],
        (None, false) => input,
        _ => return None,
    };

    let (local, domain) = address.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    let forbidden = |c: char| {
        c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '@' | ',' | ';')
    };
    if local.chars().any(forbidden) {
        return None;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return None;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let valid_labels = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    });
    if !valid_labels {
        return None;
    }

    Some(format!("{local}@{domain}"))
}

fn is_plausible_phone(input: &str) -> bool {
    let allowed = input
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
    let digits = input.chars().filter(char::is_ascii_digit).count();
    allowed && (7..=15).contains(&digits) && !input[1..].contains('+')
}
