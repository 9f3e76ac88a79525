//! Filter expressions built from request conditions.
//!
//! A [`Condition`] is an ordered list of clauses joined left to right by
//! `AND`/`OR`, each optionally negated. It renders into a `sqlx`
//! [`QueryBuilder`] with every value bound, and can also be evaluated
//! against JSON documents for stores that filter in memory.

use std::fmt;
use std::str::FromStr;

use irhabi_core::AppError;
use serde_json::Value as Json;
use sqlx::{MySql, QueryBuilder};

/// Field lookup operators, written as a `__op` suffix on the field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Exact,
    IExact,
    Contains,
    IContains,
    In,
    Between,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    IsNull,
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "exact" => Operator::Exact,
            "iexact" => Operator::IExact,
            "contains" => Operator::Contains,
            "icontains" => Operator::IContains,
            "in" => Operator::In,
            "between" => Operator::Between,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "startswith" => Operator::StartsWith,
            "istartswith" => Operator::IStartsWith,
            "endswith" => Operator::EndsWith,
            "iendswith" => Operator::IEndsWith,
            "isnull" => Operator::IsNull,
            _ => return Err(()),
        })
    }
}

/// Right-hand side of a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    Text(String),
    List(Vec<String>),
    Bool(bool),
}

impl CondValue {
    fn first(&self) -> String {
        match self {
            CondValue::Text(s) => s.clone(),
            CondValue::List(items) => items.first().cloned().unwrap_or_default(),
            CondValue::Bool(b) => b.to_string(),
        }
    }

    fn items(&self) -> Vec<String> {
        match self {
            CondValue::List(items) => items.clone(),
            other => vec![other.first()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        })
    }
}

/// A single field comparison, e.g. `user__name__icontains = "jo"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub path: Vec<String>,
    pub op: Operator,
    pub value: CondValue,
}

impl Lookup {
    /// Split `a__b__op` into its path and operator. A trailing segment that
    /// is not an operator is part of the path and the lookup is `exact`.
    pub fn parse(expr: &str, value: CondValue) -> Self {
        let mut path: Vec<String> = expr.split("__").map(str::to_string).collect();
        let op = match path.last().map(|s| s.parse::<Operator>()) {
            Some(Ok(op)) if path.len() > 1 => {
                path.pop();
                op
            }
            _ => Operator::Exact,
        };
        Self { path, op, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Lookup(Lookup),
    Group(Condition),
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    connector: Connector,
    negate: bool,
    expr: Expr,
}

/// An ordered, left-associative chain of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    fn push(mut self, connector: Connector, negate: bool, expr: Expr) -> Self {
        self.clauses.push(Clause {
            connector,
            negate,
            expr,
        });
        self
    }

    pub fn and(self, expr: &str, value: CondValue) -> Self {
        self.push(Connector::And, false, Expr::Lookup(Lookup::parse(expr, value)))
    }

    pub fn and_not(self, expr: &str, value: CondValue) -> Self {
        self.push(Connector::And, true, Expr::Lookup(Lookup::parse(expr, value)))
    }

    pub fn or(self, expr: &str, value: CondValue) -> Self {
        self.push(Connector::Or, false, Expr::Lookup(Lookup::parse(expr, value)))
    }

    pub fn or_not(self, expr: &str, value: CondValue) -> Self {
        self.push(Connector::Or, true, Expr::Lookup(Lookup::parse(expr, value)))
    }

    /// Append another condition as a parenthesised group. Empty groups are
    /// dropped.
    pub fn and_cond(self, other: Condition) -> Self {
        if other.is_empty() {
            return self;
        }
        self.push(Connector::And, false, Expr::Group(other))
    }

    pub fn or_cond(self, other: Condition) -> Self {
        if other.is_empty() {
            return self;
        }
        self.push(Connector::Or, false, Expr::Group(other))
    }

    /// Render as a SQL boolean expression. Nothing is pushed when empty.
    pub fn render(&self, qb: &mut QueryBuilder<'_, MySql>) -> Result<(), AppError> {
        if self.clauses.is_empty() {
            return Ok(());
        }

        for _ in 1..self.clauses.len() {
            qb.push("(");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                qb.push(format!(" {} ", clause.connector));
            }
            if clause.negate {
                qb.push("NOT ");
            }
            qb.push("(");
            match &clause.expr {
                Expr::Lookup(lookup) => render_lookup(lookup, qb)?,
                Expr::Group(group) => group.render(qb)?,
            }
            qb.push(")");
            if i > 0 {
                qb.push(")");
            }
        }
        Ok(())
    }

    /// Evaluate against a JSON object. Path segments walk nested objects.
    pub fn matches(&self, doc: &Json) -> bool {
        let mut result = true;
        for (i, clause) in self.clauses.iter().enumerate() {
            let hit = match &clause.expr {
                Expr::Lookup(lookup) => lookup_matches(lookup, doc),
                Expr::Group(group) => group.matches(doc),
            };
            let hit = hit != clause.negate;
            result = match (i, clause.connector) {
                (0, _) => hit,
                (_, Connector::And) => result && hit,
                (_, Connector::Or) => result || hit,
            };
        }
        result
    }
}

/// Validate and backtick-quote a dotted column reference.
pub fn quote_path(path: &[String]) -> Result<String, AppError> {
    let mut quoted = Vec::with_capacity(path.len());
    for segment in path {
        if !is_identifier(segment) {
            return Err(AppError::http(400, format!("Invalid field name: {segment}")));
        }
        quoted.push(format!("`{segment}`"));
    }
    if quoted.is_empty() {
        return Err(AppError::http(400, "Empty field name"));
    }
    Ok(quoted.join("."))
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn push_text(qb: &mut QueryBuilder<'_, MySql>, value: String) {
    match value.as_str() {
        "true" => qb.push_bind(true),
        "false" => qb.push_bind(false),
        _ => qb.push_bind(value),
    };
}

fn render_lookup(lookup: &Lookup, qb: &mut QueryBuilder<'_, MySql>) -> Result<(), AppError> {
    let column = quote_path(&lookup.path)?;
    let value = &lookup.value;

    match lookup.op {
        Operator::Exact => {
            qb.push(format!("{column} = "));
            push_text(qb, value.first());
        }
        Operator::IExact => {
            qb.push(format!("LOWER({column}) = LOWER("));
            qb.push_bind(value.first());
            qb.push(")");
        }
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let sign = match lookup.op {
                Operator::Gt => ">",
                Operator::Gte => ">=",
                Operator::Lt => "<",
                _ => "<=",
            };
            qb.push(format!("{column} {sign} "));
            qb.push_bind(value.first());
        }
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            qb.push(format!("{column} LIKE BINARY "));
            qb.push_bind(like_pattern(lookup.op, &value.first()));
        }
        Operator::IContains | Operator::IStartsWith | Operator::IEndsWith => {
            qb.push(format!("LOWER({column}) LIKE LOWER("));
            qb.push_bind(like_pattern(lookup.op, &value.first()));
            qb.push(")");
        }
        Operator::In => {
            let items = value.items();
            if items.is_empty() {
                qb.push("1 = 0");
                return Ok(());
            }
            qb.push(format!("{column} IN ("));
            let mut sep = qb.separated(", ");
            for item in items {
                sep.push_bind(item);
            }
            sep.push_unseparated(")");
        }
        Operator::Between => {
            let items = value.items();
            let [low, high] = items.as_slice() else {
                return Err(AppError::http(
                    400,
                    format!("between on {column} needs exactly two values"),
                ));
            };
            qb.push(format!("{column} BETWEEN "));
            qb.push_bind(low.clone());
            qb.push(" AND ");
            qb.push_bind(high.clone());
        }
        Operator::IsNull => {
            let is_null = match value {
                CondValue::Bool(b) => *b,
                other => other.first() == "true",
            };
            qb.push(format!(
                "{column} IS {}NULL",
                if is_null { "" } else { "NOT " }
            ));
        }
    }
    Ok(())
}

fn like_pattern(op: Operator, value: &str) -> String {
    let escaped = escape_like(value);
    match op {
        Operator::StartsWith | Operator::IStartsWith => format!("{escaped}%"),
        Operator::EndsWith | Operator::IEndsWith => format!("%{escaped}"),
        _ => format!("%{escaped}%"),
    }
}

fn resolve<'a>(doc: &'a Json, path: &[String]) -> Option<&'a Json> {
    path.iter().try_fold(doc, |node, key| node.get(key))
}

fn json_text(value: &Json) -> Option<String> {
    match value {
        Json::Null => None,
        Json::String(s) => Some(s.clone()),
        Json::Bool(b) => Some(b.to_string()),
        Json::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn loosely_equal(field: &Json, expected: &str) -> bool {
    match field {
        Json::Bool(b) => match expected {
            "true" | "1" => *b,
            "false" | "0" => !*b,
            _ => false,
        },
        Json::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        other => json_text(other).is_some_and(|t| t == expected),
    }
}

fn ordering(field: &Json, expected: &str) -> Option<std::cmp::Ordering> {
    if let (Some(a), Ok(b)) = (field.as_f64(), expected.parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    json_text(field).map(|t| t.as_str().cmp(expected))
}

fn lookup_matches(lookup: &Lookup, doc: &Json) -> bool {
    let field = resolve(doc, &lookup.path);

    if lookup.op == Operator::IsNull {
        let want_null = match &lookup.value {
            CondValue::Bool(b) => *b,
            other => other.first() == "true",
        };
        let is_null = field.is_none_or(Json::is_null);
        return is_null == want_null;
    }

    let Some(field) = field.filter(|f| !f.is_null()) else {
        return false;
    };
    let expected = lookup.value.first();
    let text = json_text(field).unwrap_or_default();

    use std::cmp::Ordering::{Equal, Greater, Less};
    match lookup.op {
        Operator::Exact => loosely_equal(field, &expected),
        Operator::IExact => text.to_lowercase() == expected.to_lowercase(),
        Operator::Contains => text.contains(&expected),
        Operator::IContains => text.to_lowercase().contains(&expected.to_lowercase()),
        Operator::StartsWith => text.starts_with(&expected),
        Operator::IStartsWith => text.to_lowercase().starts_with(&expected.to_lowercase()),
        Operator::EndsWith => text.ends_with(&expected),
        Operator::IEndsWith => text.to_lowercase().ends_with(&expected.to_lowercase()),
        Operator::Gt => ordering(field, &expected) == Some(Greater),
        Operator::Gte => matches!(ordering(field, &expected), Some(Greater | Equal)),
        Operator::Lt => ordering(field, &expected) == Some(Less),
        Operator::Lte => matches!(ordering(field, &expected), Some(Less | Equal)),
        Operator::In => lookup
            .value
            .items()
            .iter()
            .any(|item| loosely_equal(field, item)),
        Operator::Between => match lookup.value.items().as_slice() {
            [low, high] => {
                matches!(ordering(field, low), Some(Greater | Equal))
                    && matches!(ordering(field, high), Some(Less | Equal))
            }
            _ => false,
        },
        Operator::IsNull => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::Execute;

    use super::*;

    fn sql(cond: &Condition) -> String {
        let mut qb = QueryBuilder::<MySql>::new("");
        cond.render(&mut qb).unwrap();
        qb.build().sql().to_string()
    }

    #[test]
    fn test_lookup_parse() {
        let l = Lookup::parse("user__name__icontains", CondValue::Text("jo".into()));
        assert_eq!(l.path, vec!["user", "name"]);
        assert_eq!(l.op, Operator::IContains);

        let l = Lookup::parse("status", CondValue::Text("1".into()));
        assert_eq!(l.path, vec!["status"]);
        assert_eq!(l.op, Operator::Exact);

        // a lone operator-like name is a column
        let l = Lookup::parse("in", CondValue::Text("1".into()));
        assert_eq!(l.path, vec!["in"]);
        assert_eq!(l.op, Operator::Exact);
    }

    #[test]
    fn test_render_chain() {
        let cond = Condition::new()
            .and("name", CondValue::Text("john".into()))
            .or_not("age__gte", CondValue::Text("30".into()))
            .and("id__in", CondValue::List(vec!["1".into(), "2".into()]));

        assert_eq!(
            sql(&cond),
            "((`name` = ?) OR NOT (`age` >= ?)) AND (`id` IN (?, ?)))"
        );
    }

    #[test]
    fn test_render_groups_and_null() {
        let inner = Condition::new().and("deleted_at__isnull", CondValue::Bool(true));
        let cond = Condition::new()
            .and("user__email__endswith", CondValue::Text("@x.com".into()))
            .and_cond(inner)
            .and_cond(Condition::new());

        assert_eq!(
            sql(&cond),
            "((`user`.`email` LIKE BINARY ?) AND ((`deleted_at` IS NULL)))"
        );
    }

    #[test]
    fn test_render_rejects_bad_identifiers() {
        let cond = Condition::new().and("name;drop", CondValue::Text("x".into()));
        let mut qb = QueryBuilder::<MySql>::new("");
        assert!(cond.render(&mut qb).is_err());

        let cond = Condition::new().and("age__between", CondValue::List(vec!["1".into()]));
        let mut qb = QueryBuilder::<MySql>::new("");
        assert!(cond.render(&mut qb).is_err());
    }

    #[test]
    fn test_matches() {
        let doc = json!({
            "name": "John Doe",
            "age": 31,
            "active": true,
            "deleted_at": null,
            "user": {"email": "john@x.com"}
        });

        let c = Condition::new().and("name__icontains", CondValue::Text("doe".into()));
        assert!(c.matches(&doc));

        let c = Condition::new()
            .and("age__between", CondValue::List(vec!["30".into(), "40".into()]))
            .and("active", CondValue::Text("true".into()));
        assert!(c.matches(&doc));

        let c = Condition::new()
            .and("age__lt", CondValue::Text("30".into()))
            .or("user__email__endswith", CondValue::Text("@x.com".into()));
        assert!(c.matches(&doc));

        let c = Condition::new().and_not("deleted_at__isnull", CondValue::Bool(true));
        assert!(!c.matches(&doc));

        let c = Condition::new().and("missing__isnull", CondValue::Bool(false));
        assert!(!c.matches(&doc));

        let c = Condition::new().and("age__in", CondValue::List(vec!["1".into(), "31".into()]));
        assert!(c.matches(&doc));

        assert!(Condition::new().matches(&doc));
    }
}
