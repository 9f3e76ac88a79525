use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Serialize, Serializer};

/// Result of running validation rules.
///
/// Failures are recorded under keys such as `user.name.required`. Compiling
/// drops the trailing rule segment, so the messages exposed to callers are
/// keyed by field path (`user.name`), keeping the first message per field.
#[derive(Debug, Clone, Default)]
pub struct Output {
    valid: bool,
    tag: Option<String>,
    failure_keys: Vec<String>,
    failures: HashMap<String, String>,
    custom: HashMap<String, String>,
    messages: BTreeMap<String, String>,
}

impl Output {
    /// An output with no failures.
    pub fn valid() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }

    /// An already compiled output holding one failure for `field`.
    pub fn with_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut o = Self::default();
        o.failure(field, message);
        o.compile();
        o
    }

    /// Marks `field` invalid with a ready-made message, for checks made
    /// outside the rule set (e.g. a uniqueness lookup).
    pub fn set_error(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.failure(format!("{field}.error"), message);
        self.compile()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Name of the rule that failed, for single-field validation.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub(crate) fn set_tag(&mut self, tag: &str) {
        self.tag = Some(tag.to_string());
    }

    /// Record a failure. Recording the same key again replaces its message.
    pub fn failure(&mut self, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        self.valid = false;
        if !self.failures.contains_key(&key) {
            self.failure_keys.push(key.clone());
        }
        self.failures.insert(key, message.into());
    }

    /// Raw failures in the order they were recorded.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.failure_keys.iter().filter_map(|k| {
            self.failures
                .get(k)
                .map(|m| (k.as_str(), m.as_str()))
        })
    }

    pub(crate) fn set_custom_messages(&mut self, custom: HashMap<String, String>) {
        self.custom = custom;
    }

    /// Compiled messages keyed by field path.
    pub fn messages(&self) -> &BTreeMap<String, String> {
        &self.messages
    }

    /// Compiled message for one field path.
    pub fn message(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    /// Message of the earliest recorded failure.
    pub fn first_message(&self) -> Option<&str> {
        self.failure_keys
            .first()
            .and_then(|k| self.message(field_path(k)))
    }

    /// Apply custom messages, then rebuild the compiled message map.
    pub fn compile(&mut self) -> &mut Self {
        self.apply_custom_messages();

        let mut compiled = BTreeMap::new();
        for key in &self.failure_keys {
            if let Some(message) = self.failures.get(key) {
                compiled
                    .entry(field_path(key).to_string())
                    .or_insert_with(|| message.clone());
            }
        }
        self.messages = compiled;
        self
    }

    fn apply_custom_messages(&mut self) {
        if self.custom.is_empty() {
            return;
        }
        for key in &self.failure_keys {
            let custom = self
                .custom
                .get(key)
                .or_else(|| self.custom.get(&wildcard(key)));
            if let Some(message) = custom {
                self.failures.insert(key.clone(), message.clone());
            }
        }
    }
}

/// `members.0.age.range` → `members.0.age`.
fn field_path(key: &str) -> &str {
    match key.rfind('.') {
        Some(idx) => &key[..idx],
        None => key,
    }
}

/// `members.0.age.range` → `members.*.age.range`.
fn wildcard(key: &str) -> String {
    key.split('.')
        .map(|seg| {
            if !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()) {
                "*"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.messages).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.messages.serialize(serializer)
    }
}
