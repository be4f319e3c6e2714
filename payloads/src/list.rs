//! The list-endpoint query convention. Every list endpoint accepts the
//! same query-string shape: `limit`/`offset` paging, a free-text `query`,
//! an `order[field]=ASC|DESC` map, a `from`/`to` date range and
//! resource-specific enum filters that may be given once or repeated.

use jiff::Timestamp;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Sort direction as sent by clients. Only the two uppercase literals
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A query parameter that may be passed once (`status=a`) or as an
/// array (`status[0]=a&status[1]=b`); both normalize to a `Vec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.into_vec()
    }
}

/// Client-supplied ordering, in map insertion order. `BTreeMap` would
/// reorder keys alphabetically, so the pairs are collected by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderMap(pub Vec<(String, SortDirection)>);

impl OrderMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for OrderMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderMapVisitor;

        impl<'de> Visitor<'de> for OrderMapVisitor {
            type Value = OrderMap;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str("a map of field name to ASC/DESC")
            }

            fn visit_map<A>(
                self,
                mut access: A,
            ) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs =
                    Vec::with_capacity(access.size_hint().unwrap_or(1));
                while let Some((field, direction)) =
                    access.next_entry::<String, SortDirection>()?
                {
                    pairs.push((field, direction));
                }
                Ok(OrderMap(pairs))
            }
        }

        deserializer.deserialize_map(OrderMapVisitor)
    }
}

/// The common query-string contract of every list endpoint.
///
/// `limit` and `offset` are intentionally unbounded, matching the
/// platform's existing behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// Free-text search term.
    pub query: Option<String>,
    pub order: Option<OrderMap>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub status: Option<OneOrMany<String>>,
    #[serde(rename = "type")]
    pub kind: Option<OneOrMany<String>>,
    pub role: Option<OneOrMany<String>>,
}

impl ListQuery {
    pub fn status_values(&self) -> Vec<String> {
        self.status.clone().map(OneOrMany::into_vec).unwrap_or_default()
    }

    pub fn kind_values(&self) -> Vec<String> {
        self.kind.clone().map(OneOrMany::into_vec).unwrap_or_default()
    }

    pub fn role_values(&self) -> Vec<String> {
        self.role.clone().map(OneOrMany::into_vec).unwrap_or_default()
    }

    /// Render back to a query string, used by the API client. Inverse of
    /// the serde shape the server parses.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(offset) = self.offset {
            parts.push(format!("offset={offset}"));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        if let Some(query) = &self.query {
            parts.push(format!("query={}", urlencode(query)));
        }
        if let Some(order) = &self.order {
            for (field, direction) in &order.0 {
                parts.push(format!(
                    "order[{}]={}",
                    urlencode(field),
                    direction.as_sql()
                ));
            }
        }
        if let Some(from) = &self.from {
            parts.push(format!("from={}", urlencode(&from.to_string())));
        }
        if let Some(to) = &self.to {
            parts.push(format!("to={}", urlencode(&to.to_string())));
        }
        push_multi(&mut parts, "status", &self.status);
        push_multi(&mut parts, "type", &self.kind);
        push_multi(&mut parts, "role", &self.role);
        parts.join("&")
    }
}

fn push_multi(
    parts: &mut Vec<String>,
    name: &str,
    values: &Option<OneOrMany<String>>,
) {
    match values {
        Some(OneOrMany::One(value)) => {
            parts.push(format!("{name}={}", urlencode(value)));
        }
        Some(OneOrMany::Many(values)) => {
            for (i, value) in values.iter().enumerate() {
                parts.push(format!("{name}[{i}]={}", urlencode(value)));
            }
        }
        None => {}
    }
}

/// Percent-encode everything outside the query-string unreserved set.
fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.'
            | b'~' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_or_many_normalizes_scalar_and_array() {
        let one: OneOrMany<String> =
            serde_json::from_str(r#""accepted""#).unwrap();
        assert_eq!(one.into_vec(), vec!["accepted".to_string()]);

        let many: OneOrMany<String> =
            serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(
            many.into_vec(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn order_map_keeps_client_order() {
        let order: OrderMap = serde_json::from_str(
            r#"{"amount":"ASC","createdAt":"DESC"}"#,
        )
        .unwrap();
        assert_eq!(
            order.0,
            vec![
                ("amount".to_string(), SortDirection::Asc),
                ("createdAt".to_string(), SortDirection::Desc),
            ]
        );
    }

    #[test]
    fn order_map_rejects_lowercase_direction() {
        let result: Result<OrderMap, _> =
            serde_json::from_str(r#"{"createdAt":"desc"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn query_string_round_trips_the_convention() {
        let query = ListQuery {
            offset: Some(20),
            limit: Some(10),
            query: Some("ivanov".to_string()),
            order: Some(OrderMap(vec![(
                "createdAt".to_string(),
                SortDirection::Desc,
            )])),
            status: Some(OneOrMany::Many(vec![
                "pending".to_string(),
                "executed".to_string(),
            ])),
            ..Default::default()
        };
        assert_eq!(
            query.to_query_string(),
            "offset=20&limit=10&query=ivanov&order[createdAt]=DESC\
             &status[0]=pending&status[1]=executed"
        );
    }

    #[test]
    fn empty_query_serializes_empty() {
        assert_eq!(ListQuery::default().to_query_string(), "");
    }
}
