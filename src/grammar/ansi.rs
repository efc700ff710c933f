use super::{DialectContext, Grammar, OrderBy};

/// Clause compilers shared by dialect grammars.
///
/// Each method renders one clause (empty string when the clause is absent);
/// [`AnsiSelectCompiler::compile`] glues the non-empty ones with single spaces.
/// Dialects decide what goes after `select`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiSelectCompiler;

impl AnsiSelectCompiler {
    /// `select [distinct ][top <top> ]<columns>`
    #[must_use]
    pub fn compile_columns(
        &self,
        grammar: &dyn Grammar,
        ctx: &DialectContext,
        top: Option<&str>,
    ) -> String {
        let mut sql = String::from("select ");
        if ctx.distinct {
            sql.push_str("distinct ");
        }
        if let Some(top) = top {
            sql.push_str("top ");
            sql.push_str(top);
            sql.push(' ');
        }
        sql.push_str(&self.columnize(grammar, &ctx.columns));
        sql
    }

    #[must_use]
    pub fn columnize(&self, grammar: &dyn Grammar, columns: &[String]) -> String {
        if columns.is_empty() {
            return "*".to_string();
        }
        columns
            .iter()
            .map(|column| grammar.wrap(column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn compile_from(&self, grammar: &dyn Grammar, ctx: &DialectContext) -> String {
        format!("from {}", grammar.wrap_table(&ctx.from))
    }

    #[must_use]
    pub fn compile_wheres(&self, ctx: &DialectContext) -> String {
        ctx.wheres
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| format!("where {text}"))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn compile_groups(&self, grammar: &dyn Grammar, ctx: &DialectContext) -> String {
        if ctx.groups.is_empty() {
            return String::new();
        }
        format!("group by {}", self.columnize(grammar, &ctx.groups))
    }

    #[must_use]
    pub fn compile_havings(&self, ctx: &DialectContext) -> String {
        ctx.havings
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| format!("having {text}"))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn compile_orders(&self, grammar: &dyn Grammar, orders: &[OrderBy]) -> String {
        if orders.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = orders
            .iter()
            .map(|order| match order {
                OrderBy::Column { column, direction } => {
                    format!("{} {direction}", grammar.wrap(column))
                }
                OrderBy::Raw(sql) => sql.clone(),
            })
            .collect();
        format!("order by {}", rendered.join(", "))
    }

    /// Full select without any limit handling beyond the optional `top`.
    #[must_use]
    pub fn compile(&self, grammar: &dyn Grammar, ctx: &DialectContext, top: Option<&str>) -> String {
        let parts = [
            self.compile_columns(grammar, ctx, top),
            self.compile_from(grammar, ctx),
            self.compile_wheres(ctx),
            self.compile_groups(grammar, ctx),
            self.compile_havings(ctx),
            self.compile_orders(grammar, &ctx.orders),
        ];
        parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
