//! List-query composition: free-text search, structured filters and sorting.
//!
//! # Responsibility
//! - Turn caller list parameters into a parameterized SQL `WHERE` and `ORDER BY`.
//! - Keep the searchable/sortable field whitelists next to each entity.
//!
//! # Invariants
//! - Column names only ever come from `&'static str` whitelists; caller text is
//!   always bound, never interpolated.
//! - Unknown `sort_by` values fall back to the entity default (silently).
//! - Absent filter parameters add no clause.

use crate::db::FOLD_FUNCTION;
use crate::pagination::PageRequest;
use log::debug;
use rusqlite::types::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Lenient parse: `desc` (any case) is descending, everything else ascending.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One sortable field and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// Public (API-facing) field name.
    pub field: &'static str,
    pub order: SortOrder,
}

/// Public field name mapped to its SQL column expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub name: &'static str,
    pub column: &'static str,
}

/// Per-entity list configuration.
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    /// Column expressions matched by free-text search.
    pub searchable: &'static [&'static str],
    /// Fields accepted by `sort_by`.
    pub sortable: &'static [FieldMap],
    pub default_sort: SortSpec,
    /// Final tiebreaker column so pages never shuffle between requests.
    pub tiebreaker: &'static str,
}

impl QueryConfig {
    fn column_for(&self, field: &str) -> Option<&'static str> {
        self.sortable
            .iter()
            .find(|candidate| candidate.name == field)
            .map(|candidate| candidate.column)
    }
}

/// Caller-supplied list parameters shared by every list operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: PageRequest,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(sort_order.into());
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Composed filter: AND-joined clauses with positional bind values and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    binds: Vec<Value>,
    sort_column: &'static str,
    sort_order: SortOrder,
    tiebreaker: &'static str,
}

impl Predicate {
    /// Adds `column = value` when `value` is present.
    pub fn and_eq(mut self, column: &'static str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.clauses.push(format!("{column} = ?"));
            self.binds.push(value.into());
        }
        self
    }

    /// Adds `column IN (...)` when `values` is non-empty.
    pub fn and_in<V: Into<Value>>(mut self, column: &'static str, values: Vec<V>) -> Self {
        if values.is_empty() {
            return self;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{column} IN ({placeholders})"));
        self.binds.extend(values.into_iter().map(Into::into));
        self
    }

    /// Adds inclusive lower/upper bounds, each only when present.
    pub fn and_range(
        mut self,
        column: &'static str,
        min: Option<impl Into<Value>>,
        max: Option<impl Into<Value>>,
    ) -> Self {
        if let Some(min) = min {
            self.clauses.push(format!("{column} >= ?"));
            self.binds.push(min.into());
        }
        if let Some(max) = max {
            self.clauses.push(format!("{column} <= ?"));
            self.binds.push(max.into());
        }
        self
    }

    /// Adds a raw clause with its own bind values.
    ///
    /// `clause` must come from code, never from caller input.
    pub fn and_clause(mut self, clause: &'static str, binds: Vec<Value>) -> Self {
        self.clauses.push(format!("({clause})"));
        self.binds.extend(binds);
        self
    }

    /// `WHERE ...` fragment, or an empty string when unconstrained.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// `ORDER BY ...` fragment including the stable tiebreaker.
    pub fn order_sql(&self) -> String {
        if self.sort_column == self.tiebreaker {
            format!(" ORDER BY {} {}", self.sort_column, self.sort_order.as_sql())
        } else {
            format!(
                " ORDER BY {} {}, {} ASC",
                self.sort_column,
                self.sort_order.as_sql(),
                self.tiebreaker
            )
        }
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    pub fn sort_column(&self) -> &'static str {
        self.sort_column
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }
}

/// Builds the base predicate from search and sort parameters.
///
/// Structured filters are chained afterwards with [`Predicate::and_eq`],
/// [`Predicate::and_in`] and [`Predicate::and_range`].
pub fn build_predicate(params: &ListParams, config: &QueryConfig) -> Predicate {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(pattern) = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(like_pattern)
    {
        if !config.searchable.is_empty() {
            let any_field = config
                .searchable
                .iter()
                .map(|column| format!("{FOLD_FUNCTION}({column}) LIKE ? ESCAPE '\\'"))
                .collect::<Vec<_>>()
                .join(" OR ");
            clauses.push(format!("({any_field})"));
            binds.extend(
                config
                    .searchable
                    .iter()
                    .map(|_| Value::Text(pattern.clone())),
            );
        }
    }

    let requested = params.sort_by.as_deref().map(str::trim);
    let (sort_column, sort_order) = match requested.and_then(|field| config.column_for(field)) {
        Some(column) => (
            column,
            params
                .sort_order
                .as_deref()
                .map_or(config.default_sort.order, SortOrder::parse_lenient),
        ),
        None => {
            if let Some(field) = requested {
                debug!("event=sort_fallback module=query status=ignored field_len={}", field.len());
            }
            let column = config
                .column_for(config.default_sort.field)
                .unwrap_or(config.tiebreaker);
            (column, config.default_sort.order)
        }
    };

    Predicate {
        clauses,
        binds,
        sort_column,
        sort_order,
        tiebreaker: config.tiebreaker,
    }
}

/// `%term%` pattern folded like `pm_fold`, with LIKE wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::{build_predicate, FieldMap, ListParams, QueryConfig, SortOrder, SortSpec};
    use rusqlite::types::Value;

    const CONFIG: QueryConfig = QueryConfig {
        searchable: &["name", "code"],
        sortable: &[
            FieldMap {
                name: "name",
                column: "name",
            },
            FieldMap {
                name: "parentId",
                column: "parent_id",
            },
        ],
        default_sort: SortSpec {
            field: "name",
            order: SortOrder::Asc,
        },
        tiebreaker: "id",
    };

    #[test]
    fn no_parameters_produce_no_where_and_default_order() {
        let predicate = build_predicate(&ListParams::default(), &CONFIG);
        assert_eq!(predicate.where_sql(), "");
        assert_eq!(predicate.order_sql(), " ORDER BY name ASC, id ASC");
        assert!(predicate.binds().is_empty());
    }

    #[test]
    fn search_matches_any_searchable_field_case_insensitively() {
        let params = ListParams::default().with_search("  Uni_Fund ");
        let predicate = build_predicate(&params, &CONFIG);
        assert_eq!(
            predicate.where_sql(),
            " WHERE (pm_fold(name) LIKE ? ESCAPE '\\' OR pm_fold(code) LIKE ? ESCAPE '\\')"
        );
        assert_eq!(
            predicate.binds(),
            &[
                Value::Text("%uni\\_fund%".to_string()),
                Value::Text("%uni\\_fund%".to_string())
            ]
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        let params = ListParams::default().with_search("   ");
        assert_eq!(build_predicate(&params, &CONFIG).where_sql(), "");
    }

    #[test]
    fn valid_sort_field_maps_to_column() {
        let params = ListParams::default().with_sort("parentId", "DESC");
        let predicate = build_predicate(&params, &CONFIG);
        assert_eq!(predicate.sort_column(), "parent_id");
        assert_eq!(predicate.sort_order(), SortOrder::Desc);
    }

    #[test]
    fn invalid_sort_field_silently_uses_default() {
        let params = ListParams::default().with_sort("password; DROP TABLE x", "desc");
        let predicate = build_predicate(&params, &CONFIG);
        assert_eq!(predicate.order_sql(), " ORDER BY name ASC, id ASC");
    }

    #[test]
    fn structured_filters_only_apply_when_present() {
        let predicate = build_predicate(&ListParams::default(), &CONFIG)
            .and_eq("parent_id", Some("p-1".to_string()))
            .and_eq("organisation_unit_id", None::<String>)
            .and_in("status", vec!["PENDING".to_string(), "FUNDED".to_string()])
            .and_in("kind", Vec::<String>::new())
            .and_range("year", Some(2020_i64), None::<i64>);

        assert_eq!(
            predicate.where_sql(),
            " WHERE parent_id = ? AND status IN (?, ?) AND year >= ?"
        );
        assert_eq!(predicate.binds().len(), 4);
        assert_eq!(predicate.binds()[3], Value::Integer(2020));
    }

    #[test]
    fn search_and_filters_are_and_joined() {
        let params = ListParams::default().with_search("law");
        let predicate =
            build_predicate(&params, &CONFIG).and_range("year", Some(2019_i64), Some(2021_i64));
        assert!(predicate.where_sql().contains(") AND year >= ? AND year <= ?"));
        assert_eq!(predicate.binds().len(), 4);
    }
}
