//! Row parsing primitives.
//!
//! Coercion never fails: a cell is [`Coerced::Empty`], a [`Coerced::Value`], or
//! [`Coerced::Invalid`] carrying the raw text so the validator can say what was wrong. Whether an
//! invalid cell matters is decided per field by the validator, never here.

use std::fmt;

use chrono::NaiveDate;

use crate::types::RawRow;

use super::header::HeaderMap;

/// The one date format accepted in uploads (culture-invariant ISO 8601 calendar date).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of coercing one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    /// Column absent or cell blank.
    Empty,
    Value(T),
    /// Cell had text that did not parse.
    Invalid { raw: String },
}

impl<T> Coerced<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Coerced::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The parsed value; malformed cells become `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Coerced::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Coerced::Empty)
    }

    pub fn invalid_raw(&self) -> Option<&str> {
        match self {
            Coerced::Invalid { raw } => Some(raw),
            _ => None,
        }
    }

    fn from_text(raw: Option<&str>, parse: impl FnOnce(&str) -> Option<T>) -> Self {
        match raw {
            None => Coerced::Empty,
            Some(text) => match parse(text) {
                Some(v) => Coerced::Value(v),
                None => Coerced::Invalid {
                    raw: text.to_string(),
                },
            },
        }
    }
}

impl<T: Copy> Coerced<T> {
    pub fn copied(&self) -> Option<T> {
        self.value().copied()
    }
}

/// A row too narrow for a resolved column; reported as a single error for that row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    pub message: String,
}

impl fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Typed access to the cells of one row through the resolved header.
#[derive(Debug, Clone, Copy)]
pub struct RowCells<'a> {
    row: &'a RawRow,
    header: &'a HeaderMap,
}

impl<'a> RowCells<'a> {
    pub fn new(row: &'a RawRow, header: &'a HeaderMap) -> Self {
        Self { row, header }
    }

    /// 1-based data row index.
    pub fn index(&self) -> usize {
        self.row.index
    }

    /// Trimmed cell text; `None` when the field is absent from the header or the cell is blank.
    pub fn raw(&self, field: &str) -> Result<Option<&'a str>, MalformedRow> {
        let Some(position) = self.header.position(field) else {
            return Ok(None);
        };
        let cell = self.row.get(position).ok_or_else(|| MalformedRow {
            message: format!(
                "row has {} cells but column '{field}' is at position {}",
                self.row.width(),
                position + 1
            ),
        })?;
        let trimmed = cell.trim();
        Ok((!trimmed.is_empty()).then_some(trimmed))
    }

    pub fn text(&self, field: &str) -> Result<Option<String>, MalformedRow> {
        Ok(self.raw(field)?.map(str::to_owned))
    }

    pub fn date(&self, field: &str) -> Result<Coerced<NaiveDate>, MalformedRow> {
        Ok(Coerced::from_text(self.raw(field)?, parse_date))
    }

    pub fn decimal(&self, field: &str) -> Result<Coerced<f64>, MalformedRow> {
        Ok(Coerced::from_text(self.raw(field)?, parse_decimal))
    }

    pub fn integer(&self, field: &str) -> Result<Coerced<i64>, MalformedRow> {
        Ok(Coerced::from_text(self.raw(field)?, parse_integer))
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Standard decimal parsing; rejects NaN and infinities.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn format_decimal(value: f64) -> String {
    value.to_string()
}

pub fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}
