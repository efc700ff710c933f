use std::fmt::Debug;

use super::blueprint::{
    Blueprint, ColumnDefinition, ColumnType, Command, DefaultValue, ForeignKeyDefinition,
    IndexKind,
};

/// Renders [`Blueprint`] commands as DDL.
pub trait SchemaGrammar: Debug + Send + Sync {
    /// Existence probe; binds the table name as its single parameter.
    fn compile_table_exists(&self, schema: Option<&str>) -> String;

    /// Lists table names of a schema; binds the schema name.
    fn compile_list_tables(&self) -> String;

    fn compile_command(&self, blueprint: &Blueprint, command: &Command) -> Vec<String>;

    fn type_sql(&self, column: &ColumnDefinition) -> String;
}

/// DDL grammar for Caché SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheSchemaGrammar;

impl CacheSchemaGrammar {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn column_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> String {
        let mut sql = format!("{} {}", column.name, self.type_sql(column));
        sql.push_str(if column.nullable { " null" } else { " not null" });
        match &column.default {
            Some(DefaultValue::Literal(value)) => {
                sql.push_str(&format!(" default '{}'", value.replace('\'', "''")));
            }
            Some(DefaultValue::Raw(value)) => {
                sql.push_str(" default ");
                sql.push_str(value);
            }
            None => {}
        }
        if column.auto_increment {
            sql.push_str(" identity");
            if !blueprint.has_primary_command() {
                sql.push_str(" primary key");
            }
        }
        sql
    }

    fn columns_sql(&self, blueprint: &Blueprint) -> Vec<String> {
        blueprint
            .columns()
            .iter()
            .map(|column| self.column_sql(blueprint, column))
            .collect()
    }

    fn compile_index(
        blueprint: &Blueprint,
        kind: IndexKind,
        name: &str,
        columns: &[String],
    ) -> String {
        let table = blueprint.table();
        let columns = columns.join(", ");
        match kind {
            IndexKind::Primary => {
                format!("alter table {table} add constraint {name} primary key ({columns})")
            }
            IndexKind::Unique => format!("create unique index {name} on {table} ({columns})"),
            IndexKind::Index => format!("create index {name} on {table} ({columns})"),
        }
    }

    fn compile_foreign(blueprint: &Blueprint, foreign: &ForeignKeyDefinition) -> String {
        let mut sql = format!(
            "alter table {} add constraint {} foreign key ({}) references {} ({})",
            blueprint.table(),
            foreign.name,
            foreign.columns.join(", "),
            foreign.on,
            foreign.references.join(", ")
        );
        if let Some(action) = &foreign.on_delete {
            sql.push_str(" on delete ");
            sql.push_str(action);
        }
        if let Some(action) = &foreign.on_update {
            sql.push_str(" on update ");
            sql.push_str(action);
        }
        sql
    }
}

impl SchemaGrammar for CacheSchemaGrammar {
    fn compile_table_exists(&self, schema: Option<&str>) -> String {
        let mut sql = String::from("select * from information_schema.tables where table_name = ?");
        if let Some(schema) = schema.filter(|schema| !schema.is_empty()) {
            sql.push_str(&format!(" and table_schema = '{}'", schema.replace('\'', "''")));
        }
        sql
    }

    fn compile_list_tables(&self) -> String {
        "select table_name from information_schema.tables where table_schema = ?".to_string()
    }

    fn compile_command(&self, blueprint: &Blueprint, command: &Command) -> Vec<String> {
        let table = blueprint.table();
        match command {
            Command::Create => vec![format!(
                "create table {table} ({})",
                self.columns_sql(blueprint).join(", ")
            )],
            Command::Add => self
                .columns_sql(blueprint)
                .into_iter()
                .map(|column| format!("alter table {table} add {column}"))
                .collect(),
            Command::Drop => vec![format!("drop table {table}")],
            // existence is checked by the connection before this runs
            Command::DropIfExists => vec![format!("drop table {table}")],
            Command::DropColumn(columns) => columns
                .iter()
                .map(|column| format!("alter table {table} drop column {column}"))
                .collect(),
            Command::Index {
                kind,
                name,
                columns,
            } => vec![Self::compile_index(blueprint, *kind, name, columns)],
            Command::DropIndex {
                kind: IndexKind::Primary,
                name,
            }
            | Command::DropForeign(name) => {
                vec![format!("alter table {table} drop constraint {name}")]
            }
            Command::DropIndex { name, .. } => vec![format!("drop index {name} on {table}")],
            Command::Foreign(index) => blueprint
                .foreign_keys()
                .get(*index)
                .map(|foreign| Self::compile_foreign(blueprint, foreign))
                .into_iter()
                .collect(),
        }
    }

    fn type_sql(&self, column: &ColumnDefinition) -> String {
        match &column.kind {
            ColumnType::Integer | ColumnType::MediumInteger => "int".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::SmallInteger => "smallint".to_string(),
            ColumnType::TinyInteger => "tinyint".to_string(),
            ColumnType::String(length) => format!("nvarchar({length})"),
            ColumnType::Char(length) => format!("nchar({length})"),
            ColumnType::Text | ColumnType::LongText | ColumnType::Json | ColumnType::Jsonb => {
                "nvarchar(max)".to_string()
            }
            ColumnType::Float { precision, .. } => format!("float({precision})"),
            ColumnType::Double => "double precision".to_string(),
            ColumnType::Decimal { precision, scale } => format!("decimal({precision}, {scale})"),
            ColumnType::Boolean => "bit".to_string(),
            ColumnType::Enum(allowed) => {
                let allowed: Vec<String> = allowed
                    .iter()
                    .map(|value| format!("N'{}'", value.replace('\'', "''")))
                    .collect();
                format!(
                    "nvarchar(255) check (\"{}\" in ({}))",
                    column.name,
                    allowed.join(", ")
                )
            }
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime | ColumnType::Timestamp => "datetime".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::Uuid => "uniqueidentifier".to_string(),
            ColumnType::Binary => "varbinary(max)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(blueprint: &Blueprint) -> Vec<String> {
        blueprint.to_sql(&CacheSchemaGrammar::new())
    }

    fn single_column(build: impl FnOnce(&mut Blueprint)) -> String {
        let mut blueprint = Blueprint::new("users");
        build(&mut blueprint);
        let statements = compile(&blueprint);
        assert_eq!(statements.len(), 1);
        statements[0].clone()
    }

    #[test]
    fn basic_create_table() {
        let mut blueprint = Blueprint::new("users");
        blueprint.create();
        blueprint.increments("id");
        blueprint.string("email", 255);
        assert_eq!(
            compile(&blueprint),
            vec![
                "create table users (id int not null identity primary key, email nvarchar(255) not null)"
            ]
        );

        let mut blueprint = Blueprint::new("users");
        blueprint.increments("id");
        blueprint.string("email", 255);
        assert_eq!(
            compile(&blueprint),
            vec![
                "alter table users add id int not null identity primary key",
                "alter table users add email nvarchar(255) not null",
            ]
        );
    }

    #[test]
    fn drop_tables_and_columns() {
        assert_eq!(single_column(|b| { b.drop(); }), "drop table users");
        assert_eq!(
            single_column(|b| { b.drop_if_exists(); }),
            "drop table users"
        );

        let mut blueprint = Blueprint::new("users");
        blueprint.drop_columns(["foo", "bar"]);
        assert_eq!(
            compile(&blueprint),
            vec![
                "alter table users drop column foo",
                "alter table users drop column bar",
            ]
        );
    }

    #[test]
    fn drop_constraints_and_indexes() {
        assert_eq!(
            single_column(|b| { b.drop_primary("foo"); }),
            "alter table users drop constraint foo"
        );
        assert_eq!(
            single_column(|b| { b.drop_unique("foo"); }),
            "drop index foo on users"
        );
        assert_eq!(
            single_column(|b| { b.drop_index("foo"); }),
            "drop index foo on users"
        );
        assert_eq!(
            single_column(|b| { b.drop_foreign("foo"); }),
            "alter table users drop constraint foo"
        );
    }

    #[test]
    fn keys_and_indexes() {
        assert_eq!(
            single_column(|b| { b.primary(["foo"]); }),
            "alter table users add constraint users_foo_primary primary key (foo)"
        );
        assert_eq!(
            single_column(|b| { b.unique(["foo"]); }),
            "create unique index users_foo_unique on users (foo)"
        );
        assert_eq!(
            single_column(|b| { b.index(["foo", "bar"]); }),
            "create index users_foo_bar_index on users (foo, bar)"
        );
        assert_eq!(
            single_column(|b| {
                b.index_named(IndexKind::Index, ["foo"], "baz");
            }),
            "create index baz on users (foo)"
        );
        assert_eq!(
            single_column(|b| {
                b.foreign("foo_id").references(["id"]).on("orders");
            }),
            "alter table users add constraint users_foo_id_foreign foreign key (foo_id) references orders (id)"
        );
        assert_eq!(
            single_column(|b| {
                b.foreign("foo_id")
                    .references(["id"])
                    .on("orders")
                    .on_delete("cascade");
            }),
            "alter table users add constraint users_foo_id_foreign foreign key (foo_id) references orders (id) on delete cascade"
        );
    }

    #[test]
    fn explicit_primary_suppresses_inline_key() {
        let mut blueprint = Blueprint::new("users");
        blueprint.create();
        blueprint.increments("id");
        blueprint.primary(["id"]);
        assert_eq!(
            compile(&blueprint),
            vec![
                "create table users (id int not null identity)",
                "alter table users add constraint users_id_primary primary key (id)",
            ]
        );
    }

    #[test]
    fn fluent_indexes_follow_commands() {
        let mut blueprint = Blueprint::new("users");
        blueprint.create();
        blueprint.string("email", 100).unique();
        blueprint.string("code", 10).primary();
        assert_eq!(
            compile(&blueprint),
            vec![
                "create table users (email nvarchar(100) not null, code nvarchar(10) not null)",
                "create unique index users_email_unique on users (email)",
                "alter table users add constraint users_code_primary primary key (code)",
            ]
        );
    }

    #[test]
    fn column_modifiers() {
        assert_eq!(
            single_column(|b| {
                b.string("foo", 255).nullable().default(DefaultValue::Literal("bar".into()));
            }),
            "alter table users add foo nvarchar(255) null default 'bar'"
        );
        assert_eq!(
            single_column(|b| {
                b.integer("foo").default(DefaultValue::Raw("0".into()));
            }),
            "alter table users add foo int not null default 0"
        );
    }

    #[test]
    fn column_types() {
        let cases: &[(fn(&mut Blueprint), &str)] = &[
            (|b| { b.char("foo", 2); }, "nchar(2)"),
            (|b| { b.text("foo"); }, "nvarchar(max)"),
            (|b| { b.long_text("foo"); }, "nvarchar(max)"),
            (|b| { b.json("foo"); }, "nvarchar(max)"),
            (|b| { b.jsonb("foo"); }, "nvarchar(max)"),
            (|b| { b.big_integer("foo"); }, "bigint"),
            (|b| { b.medium_integer("foo"); }, "int"),
            (|b| { b.small_integer("foo"); }, "smallint"),
            (|b| { b.tiny_integer("foo"); }, "tinyint"),
            (|b| { b.float("foo", 5, 2); }, "float(5)"),
            (|b| { b.double("foo"); }, "double precision"),
            (|b| { b.decimal("foo", 5, 2); }, "decimal(5, 2)"),
            (|b| { b.boolean("foo"); }, "bit"),
            (
                |b| { b.enum_("foo", ["bar", "baz"]); },
                "nvarchar(255) check (\"foo\" in (N'bar', N'baz'))",
            ),
            (|b| { b.date("foo"); }, "date"),
            (|b| { b.date_time("foo"); }, "datetime"),
            (|b| { b.time("foo"); }, "time"),
            (|b| { b.timestamp("foo"); }, "datetime"),
            (|b| { b.uuid("foo"); }, "uniqueidentifier"),
            (|b| { b.binary("foo"); }, "varbinary(max)"),
        ];
        for (build, expected) in cases {
            assert_eq!(
                single_column(*build),
                format!("alter table users add foo {expected} not null")
            );
        }
    }

    #[test]
    fn big_increments_and_timestamps() {
        assert_eq!(
            single_column(|b| { b.big_increments("id"); }),
            "alter table users add id bigint not null identity primary key"
        );
        let mut blueprint = Blueprint::new("users");
        blueprint.nullable_timestamps();
        assert_eq!(
            compile(&blueprint),
            vec![
                "alter table users add created_at datetime null",
                "alter table users add updated_at datetime null",
            ]
        );
    }

    #[test]
    fn table_exists_probe() {
        let grammar = CacheSchemaGrammar::new();
        assert_eq!(
            grammar.compile_table_exists(None),
            "select * from information_schema.tables where table_name = ?"
        );
        assert_eq!(
            grammar.compile_table_exists(Some("acme")),
            "select * from information_schema.tables where table_name = ? and table_schema = 'acme'"
        );
    }
}
