use super::SchemaGrammar;

/// Column storage type, mapped to dialect text by a [`SchemaGrammar`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Integer,
    BigInteger,
    MediumInteger,
    SmallInteger,
    TinyInteger,
    String(u32),
    Char(u32),
    Text,
    LongText,
    Json,
    Jsonb,
    Float { precision: u32, scale: u32 },
    Double,
    Decimal { precision: u32, scale: u32 },
    Boolean,
    Enum(Vec<String>),
    Date,
    DateTime,
    Time,
    Timestamp,
    Uuid,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Quoted as a string literal
    Literal(String),
    /// Emitted verbatim
    Raw(String),
}

/// One column plus its fluent modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub kind: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub auto_increment: bool,
    pub primary: bool,
    pub unique: bool,
    pub index: bool,
}

impl ColumnDefinition {
    fn new(name: &str, kind: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            default: None,
            auto_increment: false,
            primary: false,
            unique: false,
            index: false,
        }
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    pub fn default(&mut self, value: DefaultValue) -> &mut Self {
        self.default = Some(value);
        self
    }

    pub fn primary(&mut self) -> &mut Self {
        self.primary = true;
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    pub fn index(&mut self) -> &mut Self {
        self.index = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
}

impl IndexKind {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            IndexKind::Primary => "primary",
            IndexKind::Unique => "unique",
            IndexKind::Index => "index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForeignKeyDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub references: Vec<String>,
    pub on: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ForeignKeyDefinition {
    pub fn references<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn on(&mut self, table: impl Into<String>) -> &mut Self {
        self.on = table.into();
        self
    }

    pub fn on_delete(&mut self, action: impl Into<String>) -> &mut Self {
        self.on_delete = Some(action.into());
        self
    }

    pub fn on_update(&mut self, action: impl Into<String>) -> &mut Self {
        self.on_update = Some(action.into());
        self
    }
}

/// A schema change queued on a [`Blueprint`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create,
    Add,
    Drop,
    DropIfExists,
    DropColumn(Vec<String>),
    Index {
        kind: IndexKind,
        name: String,
        columns: Vec<String>,
    },
    DropIndex {
        kind: IndexKind,
        name: String,
    },
    /// Index into [`Blueprint::foreign_keys`].
    Foreign(usize),
    DropForeign(String),
}

/// Table-level schema change description.
///
/// Column methods add a column and hand back its definition for modifiers;
/// command methods queue DDL. [`Blueprint::to_sql`] renders everything in
/// order: implied `add` for new columns on an existing table, explicit
/// commands, then indexes requested through column modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    table: String,
    columns: Vec<ColumnDefinition>,
    commands: Vec<Command>,
    foreign_keys: Vec<ForeignKeyDefinition>,
}

impl Blueprint {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            commands: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKeyDefinition] {
        &self.foreign_keys
    }

    #[must_use]
    pub fn creating(&self) -> bool {
        self.commands.iter().any(|command| *command == Command::Create)
    }

    /// Whether a table-level primary key command is queued.
    #[must_use]
    pub fn has_primary_command(&self) -> bool {
        self.commands.iter().any(|command| {
            matches!(
                command,
                Command::Index {
                    kind: IndexKind::Primary,
                    ..
                }
            )
        })
    }

    /// `<table>_<columns joined by _>_<kind>`, lowercased, with `-` and `.`
    /// replaced by `_`.
    #[must_use]
    pub fn index_name(&self, kind: &str, columns: &[String]) -> String {
        let name = format!("{}_{}_{kind}", self.table, columns.join("_")).to_lowercase();
        name.replace(['-', '.'], "_")
    }

    pub fn create(&mut self) -> &mut Self {
        self.commands.push(Command::Create);
        self
    }

    pub fn drop(&mut self) -> &mut Self {
        self.commands.push(Command::Drop);
        self
    }

    pub fn drop_if_exists(&mut self) -> &mut Self {
        self.commands.push(Command::DropIfExists);
        self
    }

    pub fn drop_column(&mut self, column: impl Into<String>) -> &mut Self {
        self.drop_columns([column])
    }

    pub fn drop_columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.commands.push(Command::DropColumn(columns));
        self
    }

    fn push_drop_index(&mut self, kind: IndexKind, name: String) -> &mut Self {
        self.commands.push(Command::DropIndex { kind, name });
        self
    }

    pub fn drop_primary(&mut self, name: impl Into<String>) -> &mut Self {
        self.push_drop_index(IndexKind::Primary, name.into())
    }

    pub fn drop_unique(&mut self, name: impl Into<String>) -> &mut Self {
        self.push_drop_index(IndexKind::Unique, name.into())
    }

    pub fn drop_index(&mut self, name: impl Into<String>) -> &mut Self {
        self.push_drop_index(IndexKind::Index, name.into())
    }

    pub fn drop_foreign(&mut self, name: impl Into<String>) -> &mut Self {
        self.commands.push(Command::DropForeign(name.into()));
        self
    }

    fn push_index<I, S>(&mut self, kind: IndexKind, columns: I, name: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let name = name.map_or_else(
            || self.index_name(kind.suffix(), &columns),
            ToString::to_string,
        );
        self.commands.push(Command::Index {
            kind,
            name,
            columns,
        });
        self
    }

    pub fn primary<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(IndexKind::Primary, columns, None)
    }

    pub fn unique<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(IndexKind::Unique, columns, None)
    }

    pub fn index<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(IndexKind::Index, columns, None)
    }

    /// Index with an explicit name.
    pub fn index_named<I, S>(&mut self, kind: IndexKind, columns: I, name: &str) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_index(kind, columns, Some(name))
    }

    /// Queue a foreign key on `column`; finish it with `references` and `on`.
    pub fn foreign(&mut self, column: impl Into<String>) -> &mut ForeignKeyDefinition {
        let columns = vec![column.into()];
        let name = self.index_name("foreign", &columns);
        self.commands.push(Command::Foreign(self.foreign_keys.len()));
        self.foreign_keys.push(ForeignKeyDefinition {
            name,
            columns,
            ..ForeignKeyDefinition::default()
        });
        let last = self.foreign_keys.len() - 1;
        &mut self.foreign_keys[last]
    }

    pub fn add_column(&mut self, name: &str, kind: ColumnType) -> &mut ColumnDefinition {
        self.columns.push(ColumnDefinition::new(name, kind));
        let last = self.columns.len() - 1;
        &mut self.columns[last]
    }

    /// Auto-incrementing `int` primary key.
    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.integer_auto(name)
    }

    pub fn big_increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.big_integer_auto(name)
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Integer)
    }

    pub fn integer_auto(&mut self, name: &str) -> &mut ColumnDefinition {
        let column = self.add_column(name, ColumnType::Integer);
        column.auto_increment = true;
        column
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::BigInteger)
    }

    pub fn big_integer_auto(&mut self, name: &str) -> &mut ColumnDefinition {
        let column = self.add_column(name, ColumnType::BigInteger);
        column.auto_increment = true;
        column
    }

    pub fn medium_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::MediumInteger)
    }

    pub fn small_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::SmallInteger)
    }

    pub fn tiny_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::TinyInteger)
    }

    pub fn string(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::String(length))
    }

    pub fn char(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Char(length))
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Text)
    }

    pub fn long_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::LongText)
    }

    pub fn json(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Json)
    }

    pub fn jsonb(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Jsonb)
    }

    pub fn float(&mut self, name: &str, precision: u32, scale: u32) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Float { precision, scale })
    }

    pub fn double(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Double)
    }

    pub fn decimal(&mut self, name: &str, precision: u32, scale: u32) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Decimal { precision, scale })
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Boolean)
    }

    pub fn enum_<I, S>(&mut self, name: &str, allowed: I) -> &mut ColumnDefinition
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.add_column(name, ColumnType::Enum(allowed))
    }

    pub fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Date)
    }

    pub fn date_time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::DateTime)
    }

    pub fn time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Time)
    }

    pub fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Timestamp)
    }

    /// Nullable `created_at` and `updated_at`.
    pub fn nullable_timestamps(&mut self) -> &mut Self {
        self.timestamp("created_at").nullable();
        self.timestamp("updated_at").nullable();
        self
    }

    pub fn uuid(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Uuid)
    }

    pub fn binary(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Binary)
    }

    pub(crate) fn retain_commands(&mut self, keep: impl FnMut(&Command) -> bool) {
        self.commands.retain(keep);
    }

    fn fluent_indexes(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        for column in &self.columns {
            let columns = vec![column.name.clone()];
            // auto-increment columns carry their primary key inline
            if column.primary && !column.auto_increment {
                commands.push(Command::Index {
                    kind: IndexKind::Primary,
                    name: self.index_name("primary", &columns),
                    columns: columns.clone(),
                });
            }
            if column.unique {
                commands.push(Command::Index {
                    kind: IndexKind::Unique,
                    name: self.index_name("unique", &columns),
                    columns: columns.clone(),
                });
            }
            if column.index {
                commands.push(Command::Index {
                    kind: IndexKind::Index,
                    name: self.index_name("index", &columns),
                    columns,
                });
            }
        }
        commands
    }

    /// Render every statement this blueprint implies.
    #[must_use]
    pub fn to_sql(&self, grammar: &dyn SchemaGrammar) -> Vec<String> {
        let mut statements = Vec::new();
        if !self.creating() && !self.columns.is_empty() {
            statements.extend(grammar.compile_command(self, &Command::Add));
        }
        for command in &self.commands {
            statements.extend(grammar.compile_command(self, command));
        }
        for command in self.fluent_indexes() {
            statements.extend(grammar.compile_command(self, &command));
        }
        statements
    }
}
