use std::borrow::Cow;

use super::{AnsiSelectCompiler, DialectContext, Grammar, Limit, OrderBy};

/// Query grammar for Caché SQL.
///
/// Caché has no `OFFSET`/`FETCH`. Limits without an offset become `TOP n`;
/// anything with an offset is wrapped in a `%vid` window over a
/// `TOP ALL` subquery, ordered by `1` when no ordering was asked for.
/// Identifiers are never quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheGrammar {
    compiler: AnsiSelectCompiler,
}

impl CacheGrammar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn compile_window(&self, ctx: &DialectContext, offset: u64) -> String {
        let mut inner = ctx.clone();
        if inner.orders.is_empty() {
            inner.orders.push(OrderBy::Raw("1".to_string()));
        }
        let inner_sql = self.compiler.compile(self, &inner, Some("all"));
        let constraint = Self::row_constraint(offset, ctx.limit);
        format!("select *, %vid from ({inner_sql}) where %vid {constraint}")
    }

    fn row_constraint(offset: u64, limit: Option<Limit>) -> String {
        let start = offset.saturating_add(1);
        match limit {
            Some(Limit::Rows(rows)) if rows > 0 => {
                format!("between {start} and {}", offset.saturating_add(rows))
            }
            _ => format!(">= {start}"),
        }
    }
}

impl Grammar for CacheGrammar {
    fn compile_select(&self, ctx: &DialectContext) -> String {
        match ctx.offset {
            Some(offset) if offset > 0 => self.compile_window(ctx, offset),
            _ => {
                // zero rows means no limit, as in the window path
                let top = match ctx.limit {
                    Some(Limit::Rows(0)) | None => None,
                    Some(Limit::Rows(rows)) => Some(Cow::Owned(rows.to_string())),
                    Some(Limit::All) => Some(Cow::Borrowed("all")),
                };
                self.compiler.compile(self, ctx, top.as_deref())
            }
        }
    }

    fn wrap<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Direction;

    fn users() -> DialectContext {
        DialectContext::table("users")
    }

    #[test]
    fn offset_only_is_unbounded_window() {
        let ctx = DialectContext {
            offset: Some(10),
            ..users()
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&ctx),
            "select *, %vid from (select top all * from users order by 1) where %vid >= 11"
        );
    }

    #[test]
    fn offset_and_limit_is_between_window() {
        let ctx = DialectContext {
            offset: Some(5),
            limit: Some(Limit::Rows(10)),
            ..users()
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&ctx),
            "select *, %vid from (select top all * from users order by 1) where %vid between 6 and 15"
        );
    }

    #[test]
    fn single_row_pages() {
        let first = DialectContext {
            offset: Some(0),
            limit: Some(Limit::Rows(1)),
            ..users()
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&first),
            "select top 1 * from users"
        );
        let second = DialectContext {
            offset: Some(1),
            ..first
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&second),
            "select *, %vid from (select top all * from users order by 1) where %vid between 2 and 2"
        );
    }

    #[test]
    fn huge_offsets_saturate() {
        let ctx = DialectContext {
            offset: Some(u64::MAX),
            limit: Some(Limit::Rows(10)),
            ..users()
        };
        let max = u64::MAX;
        assert_eq!(
            CacheGrammar::new().compile_select(&ctx),
            format!(
                "select *, %vid from (select top all * from users order by 1) where %vid between {max} and {max}"
            )
        );
    }

    #[test]
    fn zero_row_limit_is_unbounded_on_both_paths() {
        let first = DialectContext {
            limit: Some(Limit::Rows(0)),
            ..users()
        };
        assert_eq!(CacheGrammar::new().compile_select(&first), "select * from users");
        let later = DialectContext {
            offset: Some(4),
            ..first
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&later),
            "select *, %vid from (select top all * from users order by 1) where %vid >= 5"
        );
    }

    #[test]
    fn explicit_ordering_replaces_synthetic_one() {
        let ctx = DialectContext {
            columns: vec!["id".into()],
            wheres: Some("age > ?".into()),
            orders: vec![OrderBy::Column {
                column: "id".into(),
                direction: Direction::Desc,
            }],
            offset: Some(20),
            limit: Some(Limit::All),
            ..users()
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&ctx),
            "select *, %vid from (select top all id from users where age > ? order by id desc) where %vid >= 21"
        );
    }

    #[test]
    fn limit_without_offset_keeps_ordering_and_distinct() {
        let ctx = DialectContext {
            distinct: true,
            columns: vec!["email".into()],
            orders: vec![OrderBy::Raw("email".into())],
            limit: Some(Limit::Rows(3)),
            ..users()
        };
        assert_eq!(
            CacheGrammar::new().compile_select(&ctx),
            "select distinct top 3 email from users order by email"
        );
    }

    #[test]
    fn identifiers_pass_through() {
        let grammar = CacheGrammar::new();
        assert_eq!(grammar.wrap("group"), "group");
        assert_eq!(grammar.wrap_table("acme.users"), "acme.users");
    }
}
