//! Request-to-query translation for list endpoints.
//!
//! Every list endpoint accepts the same query-string contract
//! (`limit`/`offset`, free-text `query`, an `order[field]` map, a
//! `from`/`to` range and enum filters that may be scalar or repeated) and
//! composes the same way: enum filters, date range and text search are
//! AND-ed into one `WHERE`, then ordering and paging are appended. This
//! module centralizes that composition as [`ListSpec`], rendered through
//! [`sqlx::QueryBuilder`] so every fragment stays bind-parameterized.
//!
//! Two behaviors are kept verbatim from the platform's existing contract:
//! a numeric search term degrades the free-text search to an exact match,
//! and `limit`/`offset` are not bounded.

use jiff::Timestamp;
use jiff_sqlx::ToSqlx;
use payloads::list::{ListQuery, OrderMap, SortDirection};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),
    #[error("malformed query string: {0}")]
    Malformed(#[from] serde_qs::Error),
}

/// Parse the raw query string of a list request. Plain
/// `serde_urlencoded` cannot express the nested `order[field]=DESC`
/// map, hence serde_qs.
pub fn parse_query(query_string: &str) -> Result<ListQuery, ListError> {
    Ok(serde_qs::Config::new(5, false).deserialize_str(query_string)?)
}

/// Paging window. Defaults to the first ten rows; negative inputs clamp
/// to zero. No upper bound is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub fn from_query(query: &ListQuery) -> Self {
        Self {
            offset: query.offset.unwrap_or(0).max(0),
            limit: query.limit.unwrap_or(10).max(0),
        }
    }
}

/// Allowlist mapping client-facing sort field names to SQL columns.
/// Anything outside the list is rejected, never interpolated.
pub struct SortColumns(pub &'static [(&'static str, &'static str)]);

impl SortColumns {
    fn resolve(&self, field: &str) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
    }
}

fn resolve_order(
    order: Option<&OrderMap>,
    sortable: &SortColumns,
) -> Result<Vec<(&'static str, SortDirection)>, ListError> {
    let Some(order) = order.filter(|map| !map.is_empty()) else {
        return Ok(vec![("created_at", SortDirection::Desc)]);
    };
    order
        .0
        .iter()
        .map(|(field, direction)| {
            sortable
                .resolve(field)
                .map(|column| (column, *direction))
                .ok_or_else(|| ListError::UnknownSortField(field.clone()))
        })
        .collect()
}

/// Resolve the client ordering into a raw `ORDER BY` fragment, for the
/// few hand-written queries that cannot go through [`ListSpec`]. Columns
/// pass the same allowlist.
pub fn resolve_order_sql(
    query: &ListQuery,
    sortable: &SortColumns,
) -> Result<String, ListError> {
    let order = resolve_order(query.order.as_ref(), sortable)?;
    Ok(order
        .iter()
        .map(|(column, direction)| {
            format!("{column} {}", direction.as_sql())
        })
        .collect::<Vec<_>>()
        .join(", "))
}

struct Search {
    term: String,
    fields: &'static [&'static str],
}

/// One normalized list query: filters, range, search, ordering, paging.
/// Build it from the request, then run `count` + rows from the same spec.
pub struct ListSpec {
    search: Option<Search>,
    filters: Vec<(&'static str, Vec<String>)>,
    range: Option<(&'static str, Timestamp, Timestamp)>,
    order: Vec<(&'static str, SortDirection)>,
    page: Page,
}

impl ListSpec {
    pub fn from_query(
        query: &ListQuery,
        sortable: &SortColumns,
    ) -> Result<Self, ListError> {
        Ok(Self {
            search: None,
            filters: Vec::new(),
            range: None,
            order: resolve_order(query.order.as_ref(), sortable)?,
            page: Page::from_query(query),
        })
    }

    /// OR-of-matches free-text search across `fields`. A term that
    /// parses as a number becomes an exact match on the parsed value;
    /// anything else becomes a case-insensitive substring match. Empty
    /// terms and empty field lists contribute nothing.
    pub fn search(
        mut self,
        term: Option<&str>,
        fields: &'static [&'static str],
    ) -> Self {
        match term {
            Some(term) if !term.is_empty() && !fields.is_empty() => {
                self.search = Some(Search {
                    term: term.to_string(),
                    fields,
                });
            }
            _ => {}
        }
        self
    }

    /// `column = ANY(values)`; skipped when `values` is empty.
    pub fn filter_any(
        mut self,
        column: &'static str,
        values: Vec<String>,
    ) -> Self {
        if !values.is_empty() {
            self.filters.push((column, values));
        }
        self
    }

    /// Constrain `column` to `[from, to]` when either bound was given;
    /// absent bounds default to the epoch and now.
    pub fn date_range(
        mut self,
        column: &'static str,
        query: &ListQuery,
        now: Timestamp,
    ) -> Self {
        if query.from.is_some() || query.to.is_some() {
            self.range = Some((
                column,
                query.from.unwrap_or(Timestamp::UNIX_EPOCH),
                query.to.unwrap_or(now),
            ));
        }
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut prefix = " WHERE ";

        for (column, values) in &self.filters {
            qb.push(prefix);
            prefix = " AND ";
            qb.push(format!("{column}::text = ANY("));
            qb.push_bind(values.clone());
            qb.push(")");
        }

        if let Some((column, from, to)) = &self.range {
            qb.push(prefix);
            prefix = " AND ";
            qb.push(format!("{column} >= "));
            qb.push_bind(from.to_sqlx());
            qb.push(format!(" AND {column} <= "));
            qb.push_bind(to.to_sqlx());
        }

        if let Some(search) = &self.search {
            qb.push(prefix);
            qb.push("(");
            // Number("7") semantics: the parsed value, not the raw term,
            // is what gets compared.
            match search.term.parse::<f64>() {
                Ok(numeric) => {
                    for (i, field) in search.fields.iter().enumerate() {
                        if i > 0 {
                            qb.push(" OR ");
                        }
                        qb.push(format!("{field}::text = "));
                        qb.push_bind(numeric.to_string());
                    }
                }
                Err(_) => {
                    let pattern = format!("%{}%", search.term);
                    for (i, field) in search.fields.iter().enumerate() {
                        if i > 0 {
                            qb.push(" OR ");
                        }
                        qb.push(format!("{field}::text ILIKE "));
                        qb.push_bind(pattern.clone());
                    }
                }
            }
            qb.push(")");
        }
    }

    fn push_tail(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" ORDER BY ");
        for (i, (column, direction)) in self.order.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(format!("{column} {}", direction.as_sql()));
        }
        qb.push(" LIMIT ");
        qb.push_bind(self.page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(self.page.offset);
    }

    /// Run the spec: a `COUNT(*)` over `from_sql` plus the page of rows
    /// selected by `select_sql from_sql`.
    pub async fn fetch<T>(
        &self,
        select_sql: &str,
        from_sql: &str,
        pool: &PgPool,
    ) -> Result<(i64, Vec<T>), sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count_qb =
            QueryBuilder::new(format!("SELECT COUNT(*) {from_sql}"));
        self.push_where(&mut count_qb);
        let count: i64 =
            count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut rows_qb =
            QueryBuilder::new(format!("{select_sql} {from_sql}"));
        self.push_where(&mut rows_qb);
        self.push_tail(&mut rows_qb);
        let items = rows_qb.build_query_as::<T>().fetch_all(pool).await?;

        Ok((count, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const SORTABLE: SortColumns = SortColumns(&[
        ("createdAt", "created_at"),
        ("amount", "amount"),
        ("status", "status"),
    ]);

    fn rendered(spec: &ListSpec) -> String {
        let mut qb = QueryBuilder::new("SELECT * FROM t");
        spec.push_where(&mut qb);
        spec.push_tail(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn page_defaults_to_first_ten() {
        let page = Page::from_query(&ListQuery::default());
        assert_eq!(page, Page { offset: 0, limit: 10 });
    }

    #[test]
    fn page_takes_query_values_verbatim() {
        let query = ListQuery {
            offset: Some(40),
            limit: Some(100_000),
            ..Default::default()
        };
        // no upper bound: a caller can request arbitrarily large pages
        let page = Page::from_query(&query);
        assert_eq!(page, Page { offset: 40, limit: 100_000 });
    }

    #[test]
    fn page_clamps_negative_values() {
        let query = ListQuery {
            offset: Some(-5),
            limit: Some(-1),
            ..Default::default()
        };
        let page = Page::from_query(&query);
        assert_eq!(page, Page { offset: 0, limit: 0 });
    }

    #[test]
    fn default_order_is_created_at_desc() {
        let spec =
            ListSpec::from_query(&ListQuery::default(), &SORTABLE).unwrap();
        assert_eq!(rendered(&spec), "SELECT * FROM t ORDER BY created_at DESC LIMIT $1 OFFSET $2");
    }

    #[test]
    fn client_order_resolves_through_allowlist() {
        let query = ListQuery {
            order: Some(OrderMap(vec![
                ("amount".to_string(), SortDirection::Asc),
                ("createdAt".to_string(), SortDirection::Desc),
            ])),
            ..Default::default()
        };
        let spec = ListSpec::from_query(&query, &SORTABLE).unwrap();
        assert!(
            rendered(&spec)
                .contains("ORDER BY amount ASC, created_at DESC")
        );
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let query = ListQuery {
            order: Some(OrderMap(vec![(
                "password_hash; DROP TABLE users".to_string(),
                SortDirection::Asc,
            )])),
            ..Default::default()
        };
        let result = ListSpec::from_query(&query, &SORTABLE);
        assert!(matches!(result, Err(ListError::UnknownSortField(_))));
    }

    #[test]
    fn filters_render_as_any_predicates() {
        let spec = ListSpec::from_query(&ListQuery::default(), &SORTABLE)
            .unwrap()
            .filter_any("status", vec!["pending".into(), "executed".into()])
            .filter_any("type", Vec::new()); // empty filter disappears
        let sql = rendered(&spec);
        assert!(sql.contains(" WHERE status::text = ANY($1)"));
        assert!(!sql.contains("type"));
    }

    #[test]
    fn text_search_is_ilike_across_fields() {
        let spec = ListSpec::from_query(&ListQuery::default(), &SORTABLE)
            .unwrap()
            .search(Some("ivanov"), &["name", "contract_number"]);
        let sql = rendered(&spec);
        assert!(sql.contains(
            "(name::text ILIKE $1 OR contract_number::text ILIKE $2)"
        ));
    }

    #[test]
    fn numeric_search_degrades_to_exact_match() {
        let spec = ListSpec::from_query(&ListQuery::default(), &SORTABLE)
            .unwrap()
            .search(Some("123"), &["contract_number"]);
        let sql = rendered(&spec);
        assert!(sql.contains("(contract_number::text = $1)"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn empty_search_contributes_nothing() {
        let spec = ListSpec::from_query(&ListQuery::default(), &SORTABLE)
            .unwrap()
            .search(Some(""), &["name"])
            .search(None, &["name"]);
        assert!(!rendered(&spec).contains("WHERE"));
    }

    #[test]
    fn date_range_applies_when_either_bound_present() {
        let now = Timestamp::UNIX_EPOCH;
        let absent = ListSpec::from_query(&ListQuery::default(), &SORTABLE)
            .unwrap()
            .date_range("created_at", &ListQuery::default(), now);
        assert!(!rendered(&absent).contains("created_at >="));

        let query = ListQuery {
            from: Some("2026-01-01T00:00:00Z".parse().unwrap()),
            ..Default::default()
        };
        let bounded = ListSpec::from_query(&query, &SORTABLE)
            .unwrap()
            .date_range("created_at", &query, now);
        let sql = rendered(&bounded);
        assert!(sql.contains("created_at >= $1 AND created_at <= $2"));
    }

    #[test]
    fn filters_range_and_search_compose_with_and() {
        let query = ListQuery {
            from: Some("2026-01-01T00:00:00Z".parse().unwrap()),
            ..Default::default()
        };
        let spec = ListSpec::from_query(&query, &SORTABLE)
            .unwrap()
            .filter_any("status", vec!["pending".into()])
            .date_range("created_at", &query, Timestamp::UNIX_EPOCH)
            .search(Some("abc"), &["name"]);
        let sql = rendered(&spec);
        let where_pos = sql.find(" WHERE ").unwrap();
        let and_count = sql[where_pos..].matches(" AND ").count();
        // three predicate groups joined by two ANDs (the range carries
        // its own inner AND)
        assert_eq!(and_count, 3);
    }

    #[test]
    fn parse_query_handles_nested_order_and_repeats() {
        let query = parse_query(
            "limit=25&offset=50&query=77&order[createdAt]=DESC\
             &status[0]=pending&status[1]=executed",
        )
        .unwrap();
        assert_eq!(query.limit, Some(25));
        assert_eq!(query.offset, Some(50));
        assert_eq!(query.query.as_deref(), Some("77"));
        assert_eq!(
            query.order.clone().unwrap().0,
            vec![("createdAt".to_string(), SortDirection::Desc)]
        );
        assert_eq!(
            query.status_values(),
            vec!["pending".to_string(), "executed".to_string()]
        );
    }
}
