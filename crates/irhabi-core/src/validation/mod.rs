//! Declarative request validation.
//!
//! Rules are written as strings such as `"required|range:1,140"`: rule names
//! separated by `|`, each optionally followed by `:` and a parameter.
//! Types opt in by implementing [`Validate`] and declaring their fields.
//!
//! ```ignore
//! impl Validate for NewUser {
//!     fn rules(&self, v: &mut Rules<'_>) {
//!         v.field("name", &self.name, "required|alpha_space")
//!             .field("age", &self.age, "required|range:1,140")
//!             .each("addresses", &self.addresses);
//!     }
//! }
//!
//! let output = Validation::new().request(&new_user);
//! ```

mod output;
mod patterns;
mod rules;
mod value;

use std::collections::HashMap;
use std::sync::LazyLock;

pub use output::Output;
pub use value::{ToValue, Value};

/// A rule implementation. Receives the value and the rule parameter and
/// returns a failure message with `{field}` standing for the field name.
pub type ValidatorFn = fn(&Value<'_>, &str) -> Result<(), String>;

static DEFAULT: LazyLock<Validation> = LazyLock::new(Validation::new);

/// Types that declare validation rules for their fields.
pub trait Validate {
    /// Declare the rules for each field.
    fn rules(&self, v: &mut Rules<'_>);

    /// Custom messages keyed by failure key, e.g. `"password.gte"` or
    /// `"members.*.age.range"`.
    fn messages(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Extra checks that cannot be expressed as rules.
    fn check(&self) -> Option<Output> {
        None
    }
}

struct Rule<'t> {
    name: &'t str,
    param: &'t str,
    func: ValidatorFn,
}

/// Rule registry.
#[derive(Clone)]
pub struct Validation {
    registry: HashMap<String, ValidatorFn>,
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

impl Validation {
    /// A registry holding every built-in rule.
    pub fn new() -> Self {
        let registry = rules::BUILTIN
            .iter()
            .map(|(name, f)| (name.to_string(), *f))
            .collect();
        Self { registry }
    }

    /// Shared registry with the built-in rules.
    pub fn global() -> &'static Validation {
        &DEFAULT
    }

    /// Register (or replace) a rule.
    pub fn register(&mut self, name: impl Into<String>, func: ValidatorFn) -> &mut Self {
        self.registry.insert(name.into(), func);
        self
    }

    fn parse<'t>(&self, tag: &'t str) -> Option<Vec<Rule<'t>>> {
        let tag = tag.trim();
        if tag.is_empty() || tag == "-" {
            return None;
        }

        tag.split('|')
            .map(|part| {
                let (name, param) = part.split_once(':').unwrap_or((part, ""));
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let func = *self.registry.get(name)?;
                Some(Rule {
                    name,
                    param: param.trim(),
                    func,
                })
            })
            .collect()
    }

    fn run(&self, value: &Value<'_>, tag: &str) -> Option<Result<(), (String, String)>> {
        let rules = self.parse(tag)?;
        for rule in rules {
            if let Err(message) = (rule.func)(value, rule.param) {
                return Some(Err((rule.name.to_string(), message)));
            }
        }
        Some(Ok(()))
    }

    /// Validate a single value against a rule string.
    ///
    /// Returns `None` when the rule string is `-`, empty, or names an unknown
    /// rule. On failure the output is keyed by the failing rule name and
    /// [`Output::tag`] reports it.
    pub fn field<V: ToValue + ?Sized>(&self, value: &V, tag: &str) -> Option<Output> {
        let result = self.run(&value.to_value(), tag)?;
        let mut out = Output::valid();
        if let Err((rule, message)) = result {
            out.failure(rule.as_str(), message.replace("{field}", "value"));
            out.set_tag(&rule);
            out.compile();
        }
        Some(out)
    }

    /// Validate an object: its declared fields, nested objects and lists,
    /// then its own [`Validate::check`]. Custom messages are applied before
    /// compiling.
    pub fn request<T: Validate + ?Sized>(&self, object: &T) -> Output {
        let mut rules = Rules {
            validation: self,
            failures: Vec::new(),
        };
        object.rules(&mut rules);

        let mut out = Output::valid();
        out.set_custom_messages(object.messages());
        for (key, message) in rules.failures {
            out.failure(key, message);
        }

        if let Some(extra) = object.check() {
            for (key, message) in extra.failures() {
                out.failure(key, message);
            }
        }

        out.compile();
        out
    }
}

/// Collects field failures while a [`Validate`] implementation declares its
/// rules.
pub struct Rules<'v> {
    validation: &'v Validation,
    failures: Vec<(String, String)>,
}

impl Rules<'_> {
    /// Check one field. Unknown or skipped rule strings are ignored.
    pub fn field<V: ToValue + ?Sized>(&mut self, name: &str, value: &V, tag: &str) -> &mut Self {
        if let Some(Err((rule, message))) = self.validation.run(&value.to_value(), tag) {
            self.failures
                .push((format!("{name}.{rule}"), message.replace("{field}", name)));
        }
        self
    }

    /// Validate a nested object; its failures are prefixed with `name.`.
    pub fn nested<T: Validate + ?Sized>(&mut self, name: &str, object: &T) -> &mut Self {
        let out = self.validation.request(object);
        for (key, message) in out.failures() {
            self.failures
                .push((format!("{name}.{key}"), message.to_string()));
        }
        self
    }

    /// Validate a nested object when present.
    pub fn optional<T: Validate>(&mut self, name: &str, object: Option<&T>) -> &mut Self {
        if let Some(object) = object {
            self.nested(name, object);
        }
        self
    }

    /// Validate each object of a list; failures are prefixed with
    /// `name.<index>.`.
    pub fn each<T: Validate>(&mut self, name: &str, items: &[T]) -> &mut Self {
        for (i, item) in items.iter().enumerate() {
            self.nested(&format!("{name}.{i}"), item);
        }
        self
    }

    /// Record a failure directly.
    pub fn fail(&mut self, key: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.failures.push((key.into(), message.into()));
        self
    }
}
