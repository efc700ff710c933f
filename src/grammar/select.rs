use super::{DialectContext, Direction, Grammar, Limit, OrderBy};
use crate::types::RowValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boolean {
    And,
    Or,
}

impl Boolean {
    fn as_sql(self) -> &'static str {
        match self {
            Boolean::And => "and",
            Boolean::Or => "or",
        }
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Basic {
        column: String,
        operator: String,
    },
    In {
        column: String,
        count: usize,
        not: bool,
    },
    InSub {
        column: String,
        query: Box<SelectQuery>,
        not: bool,
    },
    Null {
        column: String,
        not: bool,
    },
    Between {
        column: String,
        not: bool,
    },
    Raw(String),
}

#[derive(Debug, Clone)]
struct Clause {
    boolean: Boolean,
    predicate: Predicate,
}

/// Fluent description of a select, compiled by a [`Grammar`].
///
/// Values are collected as positional bindings in the order their `?`
/// markers appear: where clauses, then havings, then raw orderings.
///
/// ```rust
/// use cache_sql_middleware::prelude::*;
///
/// let query = SelectQuery::table("users")
///     .where_op("age", ">", 21)
///     .order_by("email")
///     .skip(10)
///     .take(5);
/// assert_eq!(
///     query.to_sql(&CacheGrammar::new()),
///     "select *, %vid from (select top all * from users where age > ? order by email asc) where %vid between 11 and 15"
/// );
/// assert_eq!(query.bindings(), vec![RowValues::Int(21)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    columns: Vec<String>,
    distinct: bool,
    from: String,
    wheres: Vec<Clause>,
    groups: Vec<String>,
    havings: Vec<Clause>,
    orders: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    where_bindings: Vec<RowValues>,
    having_bindings: Vec<RowValues>,
    order_bindings: Vec<RowValues>,
}

impl SelectQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(from: impl Into<String>) -> Self {
        Self::new().from(from)
    }

    /// Replace the select list.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn add_select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    fn push_where(mut self, boolean: Boolean, predicate: Predicate) -> Self {
        self.wheres.push(Clause { boolean, predicate });
        self
    }

    #[must_use]
    pub fn where_op(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<RowValues>,
    ) -> Self {
        self.where_bindings.push(value.into());
        self.push_where(
            Boolean::And,
            Predicate::Basic {
                column: column.into(),
                operator: operator.to_string(),
            },
        )
    }

    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.where_op(column, "=", value)
    }

    #[must_use]
    pub fn or_where(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<RowValues>,
    ) -> Self {
        self.where_bindings.push(value.into());
        self.push_where(
            Boolean::Or,
            Predicate::Basic {
                column: column.into(),
                operator: operator.to_string(),
            },
        )
    }

    fn push_in<I, V>(mut self, boolean: Boolean, column: String, values: I, not: bool) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        let before = self.where_bindings.len();
        self.where_bindings
            .extend(values.into_iter().map(Into::into));
        let count = self.where_bindings.len() - before;
        self.push_where(boolean, Predicate::In { column, count, not })
    }

    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.push_in(Boolean::And, column.into(), values, false)
    }

    #[must_use]
    pub fn or_where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.push_in(Boolean::Or, column.into(), values, false)
    }

    #[must_use]
    pub fn where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.push_in(Boolean::And, column.into(), values, true)
    }

    #[must_use]
    pub fn or_where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        self.push_in(Boolean::Or, column.into(), values, true)
    }

    fn push_in_sub(mut self, column: String, query: SelectQuery, not: bool) -> Self {
        self.where_bindings.extend(query.bindings());
        self.push_where(
            Boolean::And,
            Predicate::InSub {
                column,
                query: Box::new(query),
                not,
            },
        )
    }

    /// `column in (<subquery>)`; the subquery is compiled by the same grammar.
    #[must_use]
    pub fn where_in_sub(self, column: impl Into<String>, query: SelectQuery) -> Self {
        self.push_in_sub(column.into(), query, false)
    }

    #[must_use]
    pub fn where_not_in_sub(self, column: impl Into<String>, query: SelectQuery) -> Self {
        self.push_in_sub(column.into(), query, true)
    }

    #[must_use]
    pub fn where_null(self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.push_where(Boolean::And, Predicate::Null { column, not: false })
    }

    #[must_use]
    pub fn or_where_null(self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.push_where(Boolean::Or, Predicate::Null { column, not: false })
    }

    #[must_use]
    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.push_where(Boolean::And, Predicate::Null { column, not: true })
    }

    #[must_use]
    pub fn or_where_not_null(self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.push_where(Boolean::Or, Predicate::Null { column, not: true })
    }

    fn push_between(
        mut self,
        column: String,
        low: RowValues,
        high: RowValues,
        not: bool,
    ) -> Self {
        self.where_bindings.push(low);
        self.where_bindings.push(high);
        self.push_where(Boolean::And, Predicate::Between { column, not })
    }

    #[must_use]
    pub fn where_between(
        self,
        column: impl Into<String>,
        low: impl Into<RowValues>,
        high: impl Into<RowValues>,
    ) -> Self {
        self.push_between(column.into(), low.into(), high.into(), false)
    }

    #[must_use]
    pub fn where_not_between(
        self,
        column: impl Into<String>,
        low: impl Into<RowValues>,
        high: impl Into<RowValues>,
    ) -> Self {
        self.push_between(column.into(), low.into(), high.into(), true)
    }

    #[must_use]
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<RowValues>) -> Self {
        self.where_bindings.extend(bindings);
        self.push_where(Boolean::And, Predicate::Raw(sql.into()))
    }

    #[must_use]
    pub fn or_where_raw(mut self, sql: impl Into<String>, bindings: Vec<RowValues>) -> Self {
        self.where_bindings.extend(bindings);
        self.push_where(Boolean::Or, Predicate::Raw(sql.into()))
    }

    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    fn push_having(mut self, boolean: Boolean, predicate: Predicate) -> Self {
        self.havings.push(Clause { boolean, predicate });
        self
    }

    #[must_use]
    pub fn having(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<RowValues>,
    ) -> Self {
        self.having_bindings.push(value.into());
        self.push_having(
            Boolean::And,
            Predicate::Basic {
                column: column.into(),
                operator: operator.to_string(),
            },
        )
    }

    #[must_use]
    pub fn or_having(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl Into<RowValues>,
    ) -> Self {
        self.having_bindings.push(value.into());
        self.push_having(
            Boolean::Or,
            Predicate::Basic {
                column: column.into(),
                operator: operator.to_string(),
            },
        )
    }

    #[must_use]
    pub fn having_raw(mut self, sql: impl Into<String>, bindings: Vec<RowValues>) -> Self {
        self.having_bindings.extend(bindings);
        self.push_having(Boolean::And, Predicate::Raw(sql.into()))
    }

    #[must_use]
    pub fn or_having_raw(mut self, sql: impl Into<String>, bindings: Vec<RowValues>) -> Self {
        self.having_bindings.extend(bindings);
        self.push_having(Boolean::Or, Predicate::Raw(sql.into()))
    }

    #[must_use]
    pub fn order_by_direction(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(OrderBy::Column {
            column: column.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn order_by(self, column: impl Into<String>) -> Self {
        self.order_by_direction(column, Direction::Asc)
    }

    #[must_use]
    pub fn order_by_desc(self, column: impl Into<String>) -> Self {
        self.order_by_direction(column, Direction::Desc)
    }

    /// Newest first by `column`.
    #[must_use]
    pub fn latest(self, column: impl Into<String>) -> Self {
        self.order_by_desc(column)
    }

    #[must_use]
    pub fn order_by_raw(mut self, sql: impl Into<String>, bindings: Vec<RowValues>) -> Self {
        self.order_bindings.extend(bindings);
        self.orders.push(OrderBy::Raw(sql.into()));
        self
    }

    /// Non-positive values clear the limit.
    #[must_use]
    pub fn limit(mut self, rows: i64) -> Self {
        self.limit = u64::try_from(rows).ok().filter(|rows| *rows > 0);
        self
    }

    #[must_use]
    pub fn take(self, rows: i64) -> Self {
        self.limit(rows)
    }

    /// Negative values clamp to zero.
    #[must_use]
    pub fn offset(mut self, rows: i64) -> Self {
        self.offset = Some(u64::try_from(rows).unwrap_or(0));
        self
    }

    #[must_use]
    pub fn skip(self, rows: i64) -> Self {
        self.offset(rows)
    }

    /// One page of `per_page` rows; pages are numbered from 1.
    #[must_use]
    pub fn for_page(self, page: i64, per_page: i64) -> Self {
        self.skip((page - 1).saturating_mul(per_page)).take(per_page)
    }

    /// Positional bindings in marker order.
    #[must_use]
    pub fn bindings(&self) -> Vec<RowValues> {
        let mut all = Vec::with_capacity(
            self.where_bindings.len() + self.having_bindings.len() + self.order_bindings.len(),
        );
        all.extend(self.where_bindings.iter().cloned());
        all.extend(self.having_bindings.iter().cloned());
        all.extend(self.order_bindings.iter().cloned());
        all
    }

    fn compile_clauses(grammar: &dyn Grammar, clauses: &[Clause]) -> Option<String> {
        if clauses.is_empty() {
            return None;
        }
        let mut sql = String::new();
        for (idx, clause) in clauses.iter().enumerate() {
            if idx > 0 {
                sql.push(' ');
                sql.push_str(clause.boolean.as_sql());
                sql.push(' ');
            }
            sql.push_str(&Self::compile_predicate(grammar, &clause.predicate));
        }
        Some(sql)
    }

    fn compile_predicate(grammar: &dyn Grammar, predicate: &Predicate) -> String {
        let param = grammar.parameter();
        match predicate {
            Predicate::Basic { column, operator } => {
                format!("{} {operator} {param}", grammar.wrap(column))
            }
            Predicate::In { count: 0, not, .. } => {
                let always = if *not { "1 = 1" } else { "0 = 1" };
                always.to_string()
            }
            Predicate::In { column, count, not } => {
                let markers = vec![param; *count].join(", ");
                let keyword = if *not { "not in" } else { "in" };
                format!("{} {keyword} ({markers})", grammar.wrap(column))
            }
            Predicate::InSub { column, query, not } => {
                let keyword = if *not { "not in" } else { "in" };
                format!(
                    "{} {keyword} ({})",
                    grammar.wrap(column),
                    query.to_sql(grammar)
                )
            }
            Predicate::Null { column, not } => {
                let keyword = if *not { "is not null" } else { "is null" };
                format!("{} {keyword}", grammar.wrap(column))
            }
            Predicate::Between { column, not } => {
                let keyword = if *not { "not between" } else { "between" };
                format!("{} {keyword} {param} and {param}", grammar.wrap(column))
            }
            Predicate::Raw(sql) => sql.clone(),
        }
    }

    /// The portable description handed to the grammar.
    #[must_use]
    pub fn context(&self, grammar: &dyn Grammar) -> DialectContext {
        DialectContext {
            columns: self
                .columns
                .iter()
                .filter(|column| column.as_str() != "*")
                .cloned()
                .collect(),
            distinct: self.distinct,
            from: self.from.clone(),
            wheres: Self::compile_clauses(grammar, &self.wheres),
            groups: self.groups.clone(),
            havings: Self::compile_clauses(grammar, &self.havings),
            orders: self.orders.clone(),
            limit: self.limit.map(Limit::Rows),
            offset: self.offset,
        }
    }

    #[must_use]
    pub fn to_sql(&self, grammar: &dyn Grammar) -> String {
        grammar.compile_select(&self.context(grammar))
    }
}
