//! List-endpoint query-string grammar.
//!
//! ```text
//! ?perpage=10&page=2&fields=id,name&orderby=-created_at,user.name
//!  &embeds=user&conditions=name__icontains:jo,Or.age__gte:30|id.e:65536
//! ```
//!
//! `conditions` holds groups separated by `|`; each group holds
//! `key:value` parts separated by `,`. Groups are AND-ed together. Within a
//! group the key prefix picks the connector: `And.` (default), `Or.`,
//! `AndNot.`, `OrNot.`. A key ending in `.e` carries an id obfuscated with
//! [`irhabi_core::common::encrypt`] and is decrypted on parse.

use std::collections::HashMap;

use irhabi_core::AppError;
use irhabi_core::common::decrypt;
use serde::{Deserialize, Serialize};
use sqlx::{MySql, QueryBuilder};

use crate::condition::{CondValue, Condition, quote_path};

/// Largest page size a client may ask for; bigger `perpage` values are clamped.
pub const MAX_PER_PAGE: u64 = 1000;

/// Parsed list parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestQuery {
    /// Condition groups, each an ordered list of `(key, value)` parts.
    pub conditions: Vec<Vec<(String, String)>>,
    pub fields: Vec<String>,
    pub order_by: Vec<String>,
    pub embeds: Vec<String>,
    pub offset: u64,
    /// `None` means no limit.
    pub limit: Option<u64>,
}

impl RequestQuery {
    /// Read the recognised parameters; anything else is ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut rq = RequestQuery::default();
        let get = |key: &str| params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(limit) = get("perpage").and_then(|v| v.parse::<u64>().ok()).filter(|v| *v > 0) {
            rq.limit = Some(limit.min(MAX_PER_PAGE));
        }

        if let Some(page) = get("page").and_then(|v| v.parse::<u64>().ok()).filter(|v| *v > 0) {
            rq.offset = rq.limit.unwrap_or(0).saturating_mul(page - 1);
        }

        if let Some(fields) = get("fields") {
            rq.fields = split_list(fields, false);
        }

        if let Some(order) = get("orderby") {
            rq.order_by = split_list(order, true);
        }

        if let Some(embeds) = get("embeds") {
            rq.embeds = split_list(embeds, true);
        }

        if let Some(conditions) = get("conditions") {
            rq.conditions = conditions
                .split('|')
                .map(parse_group)
                .filter(|g| !g.is_empty())
                .collect();
        }

        rq
    }

    /// Remove `name` from the embeds, returning whether it was present.
    pub fn exclude_embed(&mut self, name: &str) -> bool {
        let before = self.embeds.len();
        self.embeds.retain(|e| e != name);
        self.embeds.len() != before
    }

    /// Build the filter tree: groups AND-ed together.
    pub fn condition(&self) -> Condition {
        self.conditions
            .iter()
            .fold(Condition::new(), |acc, group| {
                acc.and_cond(group_condition(group))
            })
    }

    /// Push `WHERE`, `ORDER BY`, and `LIMIT/OFFSET` onto a query.
    pub fn apply(&self, qb: &mut QueryBuilder<'_, MySql>) -> Result<(), AppError> {
        self.apply_filter(qb)?;

        if !self.order_by.is_empty() {
            qb.push(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                let (column, direction) = match order.strip_prefix('-') {
                    Some(column) => (column, "DESC"),
                    None => (order.as_str(), "ASC"),
                };
                qb.push(format!("{} {direction}", quote_column(column)?));
            }
        }

        if let Some(limit) = self.limit {
            qb.push(format!(" LIMIT {limit} OFFSET {}", self.offset));
        } else if self.offset > 0 {
            qb.push(format!(" LIMIT 18446744073709551615 OFFSET {}", self.offset));
        }
        Ok(())
    }

    /// Push only the `WHERE` clause.
    pub fn apply_filter(&self, qb: &mut QueryBuilder<'_, MySql>) -> Result<(), AppError> {
        let cond = self.condition();
        if !cond.is_empty() {
            qb.push(" WHERE ");
            cond.render(qb)?;
        }
        Ok(())
    }

    /// `SELECT <fields> FROM <table> ...` with filter, order and paging.
    pub fn select<'a>(&self, table: &str) -> Result<QueryBuilder<'a, MySql>, AppError> {
        let columns = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(|f| quote_column(f))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut qb = QueryBuilder::new(format!("SELECT {columns} FROM {}", quote_column(table)?));
        self.apply(&mut qb)?;
        Ok(qb)
    }

    /// `SELECT COUNT(*) FROM <table> ...` honouring only the filter.
    pub fn count<'a>(&self, table: &str) -> Result<QueryBuilder<'a, MySql>, AppError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", quote_column(table)?));
        self.apply_filter(&mut qb)?;
        Ok(qb)
    }
}

fn quote_column(name: &str) -> Result<String, AppError> {
    let path: Vec<String> = name.split("__").map(str::to_string).collect();
    quote_path(&path)
}

fn split_list(raw: &str, nested: bool) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| if nested { s.replace('.', "__") } else { s.to_string() })
        .collect()
}

fn parse_group(group: &str) -> Vec<(String, String)> {
    group
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| match part.split_once(':') {
            None => (part.trim().to_string(), "true".to_string()),
            Some((key, value)) => match key.strip_suffix(".e") {
                Some(plain) => {
                    let value = decrypt(value)
                        .map(|id| id.to_string())
                        .unwrap_or_else(|_| value.to_string());
                    (plain.to_string(), value)
                }
                None => (key.to_string(), value.to_string()),
            },
        })
        .collect()
}

fn group_condition(group: &[(String, String)]) -> Condition {
    group.iter().fold(Condition::new(), |cond, (key, value)| {
        let (kind, field) = if let Some(rest) = key.strip_prefix("AndNot.") {
            ("andnot", rest)
        } else if let Some(rest) = key.strip_prefix("OrNot.") {
            ("ornot", rest)
        } else if let Some(rest) = key.strip_prefix("Or.") {
            ("or", rest)
        } else {
            ("and", key.strip_prefix("And.").unwrap_or(key))
        };

        let field = field.replace('.', "__");
        let (field, value) = lookup_value(field, value);

        match kind {
            "andnot" => cond.and_not(&field, value),
            "ornot" => cond.or_not(&field, value),
            "or" => cond.or(&field, value),
            _ => cond.and(&field, value),
        }
    })
}

fn lookup_value(field: String, value: &str) -> (String, CondValue) {
    if field.ends_with("__in") || field.ends_with("__between") {
        let items = value.split('.').map(str::to_string).collect();
        (field, CondValue::List(items))
    } else if let Some(base) = field.strip_suffix("__notnull") {
        (format!("{base}__isnull"), CondValue::Bool(false))
    } else if let Some(base) = field.strip_suffix("__null") {
        (format!("{base}__isnull"), CondValue::Bool(true))
    } else {
        (field, CondValue::Text(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::Execute;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_paging() {
        let rq = RequestQuery::from_params(&params(&[("perpage", "10"), ("page", "3")]));
        assert_eq!(rq.limit, Some(10));
        assert_eq!(rq.offset, 20);

        let rq = RequestQuery::from_params(&params(&[("page", "3")]));
        assert_eq!(rq.limit, None);
        assert_eq!(rq.offset, 0);

        let rq = RequestQuery::from_params(&params(&[("perpage", "abc")]));
        assert_eq!(rq, RequestQuery::default());
    }

    #[test]
    fn test_paging_bounds() {
        let rq = RequestQuery::from_params(&params(&[("perpage", "0"), ("page", "0")]));
        assert_eq!(rq.limit, None);
        assert_eq!(rq.offset, 0);

        let rq = RequestQuery::from_params(&params(&[("perpage", "10"), ("page", "0")]));
        assert_eq!(rq.limit, Some(10));
        assert_eq!(rq.offset, 0);

        let rq = RequestQuery::from_params(&params(&[
            ("perpage", "18446744073709551615"),
            ("page", "3"),
        ]));
        assert_eq!(rq.limit, Some(MAX_PER_PAGE));
        assert_eq!(rq.offset, 2 * MAX_PER_PAGE);

        let rq = RequestQuery::from_params(&params(&[
            ("perpage", "50"),
            ("page", "18446744073709551615"),
        ]));
        assert_eq!(rq.limit, Some(50));
        assert_eq!(rq.offset, u64::MAX);

        // Beyond u64 does not parse and is ignored.
        let rq = RequestQuery::from_params(&params(&[("perpage", "99999999999999999999")]));
        assert_eq!(rq.limit, None);
    }

    #[test]
    fn test_lists() {
        let rq = RequestQuery::from_params(&params(&[
            ("fields", "id,name"),
            ("orderby", "-created_at,user.name"),
            ("embeds", "user,user.role"),
        ]));
        assert_eq!(rq.fields, vec!["id", "name"]);
        assert_eq!(rq.order_by, vec!["-created_at", "user__name"]);
        assert_eq!(rq.embeds, vec!["user", "user__role"]);
    }

    #[test]
    fn test_conditions_parse() {
        let rq = RequestQuery::from_params(&params(&[(
            "conditions",
            "name__icontains:jo,is_active,time:10:30:00|id.e:65536|ref.e:garbage",
        )]));

        assert_eq!(rq.conditions.len(), 3);
        assert_eq!(
            rq.conditions[0],
            vec![
                ("name__icontains".to_string(), "jo".to_string()),
                ("is_active".to_string(), "true".to_string()),
                ("time".to_string(), "10:30:00".to_string()),
            ]
        );
        assert_eq!(rq.conditions[1], vec![("id".to_string(), "1".to_string())]);
        assert_eq!(rq.conditions[2], vec![("ref".to_string(), "garbage".to_string())]);
    }

    #[test]
    fn test_exclude_embed() {
        let mut rq = RequestQuery::from_params(&params(&[("embeds", "user,role")]));
        assert!(rq.exclude_embed("user"));
        assert!(!rq.exclude_embed("user"));
        assert_eq!(rq.embeds, vec!["role"]);
    }

    #[test]
    fn test_select_sql() {
        let rq = RequestQuery::from_params(&params(&[
            ("fields", "id,name"),
            ("orderby", "-id"),
            ("perpage", "5"),
            ("page", "2"),
            ("conditions", "Or.name:a,OrNot.name:b|age.between:1.9"),
        ]));

        let mut qb = rq.select("users").unwrap();
        assert_eq!(
            qb.build().sql(),
            "SELECT `id`, `name` FROM `users` WHERE ((((`name` = ?) OR NOT (`name` = ?))) \
             AND ((`age` BETWEEN ? AND ?))) ORDER BY `id` DESC LIMIT 5 OFFSET 5"
        );

        let mut qb = rq.count("users").unwrap();
        assert!(qb.build().sql().starts_with("SELECT COUNT(*) FROM `users` WHERE "));
    }

    #[test]
    fn test_null_lookups() {
        let rq = RequestQuery::from_params(&params(&[(
            "conditions",
            "deleted_at.null,AndNot.email.notnull",
        )]));
        let doc = json!({"deleted_at": null, "email": null});
        assert!(rq.condition().matches(&doc));

        let doc = json!({"deleted_at": "2024-01-01", "email": null});
        assert!(!rq.condition().matches(&doc));
    }

    #[test]
    fn test_rejects_injection_in_order_by() {
        let rq = RequestQuery::from_params(&params(&[("orderby", "id;DROP TABLE users")]));
        assert!(rq.select("users").is_err());
    }
}
