use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, is_marker_boundary,
};
use scanner::{State, scan_identifier};

use crate::types::ParamKey;

/// SQL with every parameter marker in positional `?` form, plus the key each
/// marker binds to, in left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSql<'a> {
    pub sql: Cow<'a, str>,
    pub markers: Vec<ParamKey>,
}

impl PositionalSql<'_> {
    /// Distinct marker keys in order of first appearance.
    #[must_use]
    pub fn slots(&self) -> Vec<ParamKey> {
        let mut slots: Vec<ParamKey> = Vec::with_capacity(self.markers.len());
        for key in &self.markers {
            if !slots.contains(key) {
                slots.push(key.clone());
            }
        }
        slots
    }
}

/// Rewrite `:name` markers to `?` for a native layer that only knows positional markers.
///
/// A named marker is `:` followed by ASCII alphanumerics/underscores, at the
/// start of the text or right after whitespace. Raw `?` markers are kept and
/// recorded as positional keys numbered from 1. Markers inside quoted
/// literals and comments are left untouched.
///
/// Returns a borrowed `Cow` when no named marker had to be rewritten.
///
/// ```rust
/// use cache_sql_middleware::prelude::*;
///
/// let rewritten = to_positional("update t set a = :a where id = :id");
/// assert_eq!(rewritten.sql, "update t set a = ? where id = ?");
/// assert_eq!(rewritten.markers, vec![ParamKey::named("a"), ParamKey::named("id")]);
/// ```
#[must_use]
pub fn to_positional(sql: &str) -> PositionalSql<'_> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut markers = Vec::new();
    let mut positional = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => {
                    positional += 1;
                    markers.push(ParamKey::Position(positional));
                }
                b':' if is_marker_boundary(bytes, idx) => {
                    if let Some((end, name)) = scan_identifier(bytes, idx + 1) {
                        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                        buf.push_str(&sql[copied..idx]);
                        buf.push('?');
                        copied = end;
                        markers.push(ParamKey::Named(name.to_string()));
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    PositionalSql { sql, markers }
}

/// Split a script on `;` outside quoted literals and comments.
///
/// Statements are trimmed; empty ones are dropped.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b';' => {
                    statements.push(&sql[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            },
            // doubled quotes close and reopen, which leaves the state unchanged
            State::SingleQuoted if b == b'\'' => state = State::Normal,
            State::DoubleQuoted if b == b'"' => state = State::Normal,
            State::LineComment if b == b'\n' => state = State::Normal,
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    statements.push(&sql[start..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ParamKey {
        ParamKey::Named(name.to_string())
    }

    #[test]
    fn rewrites_named_markers_in_order() {
        let res = to_positional("insert into t (a, b) values ( :a, :b )");
        assert_eq!(res.sql, "insert into t (a, b) values ( ?, ? )");
        assert_eq!(res.markers, vec![named("a"), named("b")]);
    }

    #[test]
    fn marker_at_start_of_text() {
        let res = to_positional(":only");
        assert_eq!(res.sql, "?");
        assert_eq!(res.markers, vec![named("only")]);
    }

    #[test]
    fn requires_whitespace_before_marker() {
        let res = to_positional("select a::int, b from t where c =:c and d = :d");
        assert_eq!(res.sql, "select a::int, b from t where c =:c and d = ?");
        assert_eq!(res.markers, vec![named("d")]);
    }

    #[test]
    fn name_stops_at_punctuation() {
        let res = to_positional("select * from t where id in ( :a,:b) and x = :x)");
        assert_eq!(res.sql, "select * from t where id in ( ?,:b) and x = ?)");
        assert_eq!(res.markers, vec![named("a"), named("x")]);
    }

    #[test]
    fn keeps_raw_question_marks_as_positions() {
        let res = to_positional("select * from t where a = ? and b = :b and c = ?");
        assert_eq!(res.sql, "select * from t where a = ? and b = ? and c = ?");
        assert_eq!(
            res.markers,
            vec![ParamKey::Position(1), named("b"), ParamKey::Position(2)]
        );
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select ' :a ?', \" :b\" -- :c ?\n/* :d /* ? */ */ from t where e = :e";
        let res = to_positional(sql);
        assert_eq!(
            res.sql,
            "select ' :a ?', \" :b\" -- :c ?\n/* :d /* ? */ */ from t where e = ?"
        );
        assert_eq!(res.markers, vec![named("e")]);
    }

    #[test]
    fn borrowed_when_nothing_named() {
        let sql = "select * from t where a = ?";
        let res = to_positional(sql);
        assert!(matches!(res.sql, Cow::Borrowed(_)));
        assert_eq!(res.markers, vec![ParamKey::Position(1)]);
    }

    #[test]
    fn multibyte_text_survives_rewrite() {
        let res = to_positional("select 'héllo' as g, :name as n from ünïcode");
        assert_eq!(res.sql, "select 'héllo' as g, ? as n from ünïcode");
    }

    #[test]
    fn repeated_names_share_one_slot() {
        let res = to_positional("select * from t where a = :v or b = :v");
        assert_eq!(res.markers, vec![named("v"), named("v")]);
        assert_eq!(res.slots(), vec![named("v")]);
    }

    #[test]
    fn marker_count_matches_question_marks() {
        let sql = "update t set a = :a, b = :b, c = :c where id = :id and k = ?";
        let res = to_positional(sql);
        assert_eq!(res.sql.matches('?').count(), res.markers.len());
    }

    #[test]
    fn splits_scripts_outside_literals() {
        let script = "create table t (a int);\ninsert into t values (';');\n-- done; really\n/* ; */ ;";
        assert_eq!(
            split_statements(script),
            vec![
                "create table t (a int)",
                "insert into t values (';')",
                "-- done; really\n/* ; */",
            ]
        );
        assert!(split_statements(" ; ;").is_empty());
    }
}
