//! Built-in validation rules.
//!
//! Every rule receives the field value and the raw parameter that followed
//! the `:` in the rule string. Failure messages use `{field}` as the
//! placeholder for the field name.

use std::fmt;

use regex::Regex;

use super::patterns::{ALPHA, ALPHA_NUM, ALPHA_NUM_SPACE, ALPHA_SPACE, CREDIT_CARD, URL_SCHEMES};
use super::{ValidatorFn, Value};

pub(super) const BUILTIN: &[(&str, ValidatorFn)] = &[
    ("required", required),
    ("numeric", numeric),
    ("alpha", alpha),
    ("alpha_num", alpha_num),
    ("alpha_num_space", alpha_num_space),
    ("alpha_space", alpha_space),
    ("email", email),
    ("url", url),
    ("json", json),
    ("cc", credit_card),
    ("lte", lte),
    ("gte", gte),
    ("lt", lt),
    ("gt", gt),
    ("range", range),
    ("contains", contains),
    ("match", matches),
    ("same", same),
    ("in", is_in),
    ("not_in", not_in),
    ("ean", ean),
];

/// A rule parameter: an integer, a float, or free text measured by its
/// character count.
#[derive(Debug, Clone, PartialEq)]
enum Param {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Param {
    fn parse(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            Param::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            Param::Float(f)
        } else {
            Param::Text(raw.to_string())
        }
    }

    fn size(&self) -> f64 {
        match self {
            Param::Int(i) => *i as f64,
            Param::Float(f) => *f,
            Param::Text(s) => s.chars().count() as f64,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(i) => write!(f, "{i}"),
            Param::Float(v) => write!(f, "{v}"),
            Param::Text(s) => write!(f, "{s}"),
        }
    }
}

fn check(valid: bool, message: impl Into<String>) -> Result<(), String> {
    if valid { Ok(()) } else { Err(message.into()) }
}

/// Run `test` on the textual form, passing empty values.
fn format_rule(value: &Value<'_>, test: impl FnOnce(&str) -> bool, message: &str) -> Result<(), String> {
    let text = value.text();
    if text.is_empty() {
        return Ok(());
    }
    check(test(&text), message)
}

fn required(value: &Value<'_>, _: &str) -> Result<(), String> {
    check(value.is_present(), "The {field} field is required.")
}

fn numeric(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(value, |s| s.parse::<f64>().is_ok(), "The {field} must be a number.")
}

fn alpha(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(value, |s| ALPHA.is_match(s), "The {field} may only contain letters.")
}

fn alpha_num(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| ALPHA_NUM.is_match(s),
        "The {field} may only contain letters and numbers.",
    )
}

fn alpha_num_space(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| ALPHA_NUM_SPACE.is_match(s),
        "The {field} may only contain letters, numbers and spaces.",
    )
}

fn alpha_space(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| ALPHA_SPACE.is_match(s),
        "The {field} may only contain letters and spaces.",
    )
}

fn email(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| validator::validate_email(s),
        "The {field} must be a valid email address.",
    )
}

fn url(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(value, is_url, "The {field} format is invalid.")
}

pub(crate) fn is_url(s: &str) -> bool {
    if s.len() >= 2083 || s.len() <= 3 || s.starts_with('.') {
        return false;
    }

    let parsed = if s.contains("://") {
        url::Url::parse(s)
    } else if s.contains('.') {
        url::Url::parse(&format!("http://{s}"))
    } else {
        return false;
    };

    match parsed {
        Ok(u) => {
            URL_SCHEMES.contains(&u.scheme())
                && u.host_str().is_some_and(|h| !h.is_empty() && !h.starts_with('.'))
        }
        Err(_) => false,
    }
}

fn json(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| serde_json::from_str::<serde_json::Value>(s).is_ok(),
        "The {field} must be a valid JSON string.",
    )
}

fn credit_card(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(
        value,
        is_credit_card,
        "The {field} must be a valid credit card number.",
    )
}

pub(crate) fn is_credit_card(s: &str) -> bool {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    if !CREDIT_CARD.is_match(&digits) {
        return false;
    }

    let mut sum = 0;
    let mut double = false;
    for d in digits.bytes().rev().map(|b| (b - b'0') as u32) {
        sum += match (double, d * 2) {
            (true, n) if n >= 10 => n % 10 + 1,
            (true, n) => n,
            (false, _) => d,
        };
        double = !double;
    }
    sum % 10 == 0
}

fn compare(
    value: &Value<'_>,
    param: &str,
    holds: fn(f64, f64) -> bool,
    template: &str,
) -> Result<(), String> {
    let Some(size) = value.size() else {
        return Ok(());
    };
    let p = Param::parse(param);
    check(holds(size, p.size()), template.replace("{param}", &p.to_string()))
}

fn lte(value: &Value<'_>, param: &str) -> Result<(), String> {
    compare(value, param, |v, p| v <= p, "The {field} may not be greater than {param}.")
}

fn gte(value: &Value<'_>, param: &str) -> Result<(), String> {
    compare(value, param, |v, p| v >= p, "The {field} must be at least {param}.")
}

fn lt(value: &Value<'_>, param: &str) -> Result<(), String> {
    compare(value, param, |v, p| v < p, "The {field} must be less than {param}.")
}

fn gt(value: &Value<'_>, param: &str) -> Result<(), String> {
    compare(value, param, |v, p| v > p, "The {field} must be greater than {param}.")
}

fn range(value: &Value<'_>, param: &str) -> Result<(), String> {
    let Some((min, max)) = param.split_once(',') else {
        return Err("The {field} range needs a minimum and a maximum.".to_string());
    };
    let Some(size) = value.size() else {
        return Ok(());
    };

    let (min, max) = (Param::parse(min.trim()), Param::parse(max.trim()));
    check(
        size >= min.size() && size <= max.size(),
        format!("The {{field}} must be between {min} and {max}."),
    )
}

fn contains(value: &Value<'_>, param: &str) -> Result<(), String> {
    format_rule(value, |s| s.contains(param), "The {field} format is invalid.")
}

fn matches(value: &Value<'_>, param: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| Regex::new(param).is_ok_and(|re| re.is_match(s)),
        "The {field} format is invalid.",
    )
}

fn same(value: &Value<'_>, param: &str) -> Result<(), String> {
    format_rule(value, |s| s == param, "The {field} format is invalid.")
}

fn is_in(value: &Value<'_>, param: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| param.split(',').any(|p| p == s),
        "The selected {field} is invalid.",
    )
}

fn not_in(value: &Value<'_>, param: &str) -> Result<(), String> {
    format_rule(
        value,
        |s| !param.split(',').any(|p| p == s),
        "The selected {field} is invalid.",
    )
}

fn ean(value: &Value<'_>, _: &str) -> Result<(), String> {
    format_rule(value, is_ean13, "The {field} field is not valid ean13 code.")
}

pub(crate) fn is_ean13(s: &str) -> bool {
    if s.len() != 13 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u32> = s.bytes().map(|b| (b - b'0') as u32).collect();
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 1 { d * 3 } else { *d })
        .sum();

    (10 - sum % 10) % 10 == digits[12]
}
