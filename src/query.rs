use crate::types::{ParamKey, RowValues};

/// A SQL string and its bound parameters bundled together.
///
/// Handy for helpers that need to return both query text and params without
/// losing alignment with the markers. Values bind to `?` positions in order;
/// named values bind to their `:name` markers.
///
/// ```rust
/// use cache_sql_middleware::prelude::*;
///
/// let qp = QueryAndParams::new(
///     "insert into t (id, name) values (?, ?)",
///     vec![RowValues::Int(1), RowValues::Text("alice".into())],
/// )
/// .with_named("tag", "x");
/// assert_eq!(qp.keyed_params().len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// Values for the `?` markers, in order
    pub params: Vec<RowValues>,
    /// Values for `:name` markers
    pub named: Vec<(String, RowValues)>,
}

impl QueryAndParams {
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
            named: Vec::new(),
        }
    }

    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }

    #[must_use]
    pub fn with_named(mut self, name: &str, value: impl Into<RowValues>) -> Self {
        self.named.push((name.trim_start_matches(':').to_string(), value.into()));
        self
    }

    /// Every value under the key it binds to: positions first, then names.
    #[must_use]
    pub fn keyed_params(&self) -> Vec<(ParamKey, RowValues)> {
        let positional = self
            .params
            .iter()
            .enumerate()
            .map(|(idx, value)| (ParamKey::Position(idx + 1), value.clone()));
        let named = self
            .named
            .iter()
            .map(|(name, value)| (ParamKey::Named(name.clone()), value.clone()));
        positional.chain(named).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CacheOptions;
    use crate::query_builder::QueryBuilder;
    use crate::test_utils::{ScriptedDriver, scripted_connection};

    #[test]
    fn mixed_markers_bind_in_text_order() {
        let driver = ScriptedDriver::new();
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        let qp = QueryAndParams::new(
            "update t set a = ?, b = :b where c = ?",
            vec![RowValues::Int(1), RowValues::Int(3)],
        )
        .with_named(":b", 2);
        QueryBuilder::from_query(&conn, &qp).dml().unwrap();
        assert_eq!(
            driver.executed()[0].1,
            vec![RowValues::Int(1), RowValues::Int(2), RowValues::Int(3)]
        );
    }
}
