//! Typed filter and keyset-pagination fragments for list queries.
//!
//! Filters are assembled by conditional composition: a constraint is only
//! appended when its input is non-empty, so empty strings and empty vectors
//! mean "no constraint" rather than "match nothing".

use rusqlite::types::Value;

use crate::types::{Category, SortKey, SortOrder};

pub const MIN_PAGE_SIZE: i64 = 1;
pub const MAX_PAGE_SIZE: i64 = 20;
pub const DEFAULT_PAGE_SIZE: i64 = 5;

/// Clamps a requested page size into the supported range.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Caller-facing description of a list request, shared by the three
/// entity collections. Collections that do not support a field ignore it.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub text: Option<String>,
    pub categories: Vec<Category>,
    pub languages: Vec<String>,
    pub tags: Vec<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub cursor: Option<String>,
    pub limit: i64,
}

/// One page of ids plus the opaque continuation cursor. `next_cursor` is
/// `None` only at the definitive end of the list.
#[derive(Debug, Clone)]
pub struct Page {
    pub ids: Vec<String>,
    pub next_cursor: Option<String>,
}

/// A conjunction of SQL predicates with positional parameters.
#[derive(Debug, Default)]
pub struct SqlFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl SqlFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match over one or more text columns,
    /// OR-combined. A blank needle imposes no constraint.
    pub fn text_contains(&mut self, columns: &[&str], needle: Option<&str>) -> &mut Self {
        let Some(needle) = needle.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let parts: Vec<String> = columns
            .iter()
            .map(|col| format!("instr(lower({col}), lower(?)) > 0"))
            .collect();
        self.clauses.push(format!("({})", parts.join(" OR ")));
        for _ in columns {
            self.params.push(Value::Text(needle.to_string()));
        }
        self
    }

    /// Set membership over a single column. An empty set imposes no
    /// constraint.
    pub fn any_of(&mut self, column: &str, values: &[String]) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        let marks = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{column} IN ({marks})"));
        self.params
            .extend(values.iter().map(|v| Value::Text(v.clone())));
        self
    }

    /// True when the project's tag set intersects `tags`. An empty set
    /// imposes no constraint.
    pub fn tags_overlap(&mut self, tags: &[String]) -> &mut Self {
        if tags.is_empty() {
            return self;
        }
        let marks = vec!["?"; tags.len()].join(", ");
        self.clauses.push(format!(
            "EXISTS (SELECT 1 FROM project_tags pt WHERE pt.project_id = projects.id AND pt.tag IN ({marks}))"
        ));
        self.params
            .extend(tags.iter().map(|t| Value::Text(t.clone())));
        self
    }

    /// Keyset continuation: rows at or past the cursor row in sort order.
    /// The cursor row itself is included, matching the contract that a
    /// returned `next_cursor` addresses the first row of the next page.
    pub fn keyset(&mut self, sort_expr: &str, order: SortOrder, key: Value, id: &str) -> &mut Self {
        let cmp = match order {
            SortOrder::Asc => ">",
            SortOrder::Desc => "<",
        };
        self.clauses.push(format!(
            "({sort_expr} {cmp} ? OR ({sort_expr} = ? AND id >= ?))"
        ));
        self.params.push(key.clone());
        self.params.push(key);
        self.params.push(Value::Text(id.to_string()));
        self
    }

    /// Renders `WHERE ...` or an empty string when unconstrained.
    #[must_use]
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// `ORDER BY` for a sort key with the stable id tie-break. The tie-break is
/// always ascending regardless of the primary direction.
#[must_use]
pub fn order_by(sort_expr: &str, order: SortOrder) -> String {
    let dir = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!("ORDER BY {sort_expr} {dir}, id ASC")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_impose_no_constraint() {
        let mut f = SqlFilter::new();
        f.text_contains(&["name", "description"], None)
            .text_contains(&["name"], Some(""))
            .text_contains(&["name"], Some("   "))
            .any_of("category", &[])
            .tags_overlap(&[]);
        assert_eq!(f.where_sql(), "");
        assert!(f.params().is_empty());
    }

    #[test]
    fn text_filter_ors_columns() {
        let mut f = SqlFilter::new();
        f.text_contains(&["name", "description"], Some("chat"));
        assert_eq!(
            f.where_sql(),
            "WHERE (instr(lower(name), lower(?)) > 0 OR instr(lower(description), lower(?)) > 0)"
        );
        assert_eq!(f.params().len(), 2);
    }

    #[test]
    fn filters_are_and_combined() {
        let mut f = SqlFilter::new();
        f.text_contains(&["name"], Some("bot"))
            .any_of("category", &["DevOps".into(), "CLI".into()])
            .tags_overlap(&["Docker".into()]);
        let sql = f.where_sql();
        assert!(sql.contains("category IN (?, ?)"));
        assert!(sql.contains(" AND "));
        assert!(sql.contains("pt.tag IN (?)"));
        assert_eq!(f.params().len(), 4);
    }

    #[test]
    fn keyset_direction_follows_order() {
        let mut desc = SqlFilter::new();
        desc.keyset("updated_at", SortOrder::Desc, Value::Text("t0".into()), "p9");
        assert_eq!(
            desc.where_sql(),
            "WHERE (updated_at < ? OR (updated_at = ? AND id >= ?))"
        );

        let mut asc = SqlFilter::new();
        asc.keyset("updated_at", SortOrder::Asc, Value::Text("t0".into()), "p9");
        assert!(asc.where_sql().contains("updated_at > ?"));
    }

    #[test]
    fn order_by_keeps_id_tiebreak_ascending() {
        assert_eq!(
            order_by("COALESCE(stars, -1)", SortOrder::Desc),
            "ORDER BY COALESCE(stars, -1) DESC, id ASC"
        );
    }

    #[test]
    fn limit_clamping() {
        assert_eq!(clamp_limit(None), 5);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(50)), 20);
        assert_eq!(clamp_limit(Some(12)), 12);
    }
}
