// Argument validation for tool calls. Arguments are deserialized with serde,
// then field rules are collected so a caller sees every violation at once.
// Nothing here touches the network.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{is_valid_cpf, is_valid_email};
use crate::error::{CrmError, CrmResult};

pub const MAX_PAGE_SIZE: u64 = 100;

static CNPJ_RE: OnceLock<Regex> = OnceLock::new();

/// Deserialize tool arguments. `null` is treated as an empty object.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> CrmResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| CrmError::Validation(format!("invalid arguments: {}", e)))
}

#[derive(Debug, Default)]
pub struct Violations {
    problems: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.problems.push(message.into());
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        let ok = value.trim().chars().count() >= min;
        self.check(ok, format!("{} must have at least {} characters", field, min))
    }

    pub fn min_len_opt(&mut self, field: &str, value: Option<&str>, min: usize) -> &mut Self {
        match value {
            Some(v) => self.min_len(field, v, min),
            None => self,
        }
    }

    pub fn positive(&mut self, field: &str, value: u64) -> &mut Self {
        self.check(value > 0, format!("{} must be a positive number", field))
    }

    pub fn positive_opt(&mut self, field: &str, value: Option<u64>) -> &mut Self {
        match value {
            Some(v) => self.positive(field, v),
            None => self,
        }
    }

    /// `page` must be positive, `limit` positive and at most 100.
    pub fn paging(&mut self, page: Option<u64>, limit: Option<u64>) -> &mut Self {
        self.positive_opt("page", page).positive_opt("limit", limit);
        if let Some(limit) = limit {
            self.check(
                limit <= MAX_PAGE_SIZE,
                format!("limit must be at most {}", MAX_PAGE_SIZE),
            );
        }
        self
    }

    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) -> &mut Self {
        match value {
            Some(v) => self.check(
                allowed.contains(&v),
                format!("{} must be one of: {}", field, allowed.join(", ")),
            ),
            None => self,
        }
    }

    pub fn cpf_opt(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.check(is_valid_cpf(v), format!("{} must have 11 digits", field)),
            None => self,
        }
    }

    pub fn cnpj_opt(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.check(is_valid_cnpj(v), format!("{} must have 14 digits", field)),
            None => self,
        }
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_valid_email(value), format!("{} is not a valid e-mail", field))
    }

    pub fn date(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            is_iso_date(value),
            format!("{} must be an ISO 8601 date (YYYY-MM-DD or YYYY-MM-DDTHH:mm:ss)", field),
        )
    }

    pub fn date_opt(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.date(field, v),
            None => self,
        }
    }

    pub fn finish(&mut self) -> CrmResult<()> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(CrmError::Validation(std::mem::take(&mut self.problems).join("; ")))
        }
    }
}

pub fn is_valid_cnpj(value: &str) -> bool {
    CNPJ_RE
        .get_or_init(|| Regex::new(r"^\d{14}$").unwrap())
        .is_match(value)
}

/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:mm:ss` or full RFC 3339.
pub fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(value).is_ok()
}
