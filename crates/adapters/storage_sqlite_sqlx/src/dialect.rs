//! Dialect adapter — renders logical statements as engine-specific SQL.
//!
//! Pure text generation: nothing here touches a connection. Identifiers are
//! validated and quoted, values always travel as positional arguments. The
//! three engines differ in placeholder syntax (`?` vs `$n`), identifier
//! quoting (`"x"` vs `` `x` ``), upsert idiom and transaction start.

use std::fmt;
use std::str::FromStr;

/// Malformed input to the statement builder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialectError {
    #[error("unsupported SQL engine: {0:?}")]
    UnsupportedEngine(String),
    #[error("unsupported isolation level: {0:?}")]
    UnsupportedIsolation(String),
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("statement needs at least one column")]
    NoColumns,
}

/// A relational engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    MySql,
}

impl FromStr for Dialect {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            _ => Err(DialectError::UnsupportedEngine(s.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        })
    }
}

/// Transaction isolation level requested for mutating work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
}

impl IsolationLevel {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "read_committed" => Ok(Self::ReadCommitted),
            "repeatable_read" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            _ => Err(DialectError::UnsupportedIsolation(s.to_string())),
        }
    }
}

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Column/value pairs of an insert or update.
pub type Columns = Vec<(&'static str, SqlValue)>;

/// Ready-to-execute SQL text and its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// A `WHERE` predicate. Multiple conditions are joined with `AND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq(&'static str, SqlValue),
    Gt(&'static str, SqlValue),
    Lt(&'static str, SqlValue),
    /// Case-sensitive match on a literal prefix.
    ///
    /// `SQLite` compares a `substr` of the column since its `LIKE` ignores
    /// ASCII case. The other engines use `LIKE` (`LIKE BINARY` on `MySQL`)
    /// with `%`, `_` and `\` escaped.
    StartsWith(&'static str, String),
    /// `column IN (subquery)`.
    In(&'static str, Box<Select>),
}

impl Condition {
    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::Eq(column, value.into())
    }

    pub fn gt(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::Gt(column, value.into())
    }

    pub fn lt(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::Lt(column, value.into())
    }

    pub fn starts_with(column: &'static str, prefix: impl Into<String>) -> Self {
        Self::StartsWith(column, prefix.into())
    }

    #[must_use]
    pub fn in_select(column: &'static str, select: Select) -> Self {
        Self::In(column, Box::new(select))
    }
}

/// Templated `SELECT` over a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    table: &'static str,
    columns: Vec<&'static str>,
    filter: Vec<Condition>,
    order: Vec<(&'static str, Order)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Select {
    /// `SELECT * FROM table`.
    #[must_use]
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filter: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter.push(condition);
        self
    }

    #[must_use]
    pub fn filters(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.filter.extend(conditions);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order.push((column, order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl Dialect {
    /// Quote a table or column name.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::InvalidIdentifier`] unless `ident` matches
    /// `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn quote(self, ident: &str) -> Result<String, DialectError> {
        let mut chars = ident.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(DialectError::InvalidIdentifier(ident.to_string()));
        }
        Ok(match self {
            Self::MySql => format!("`{ident}`"),
            Self::Sqlite | Self::Postgres => format!("\"{ident}\""),
        })
    }

    /// Statement opening a transaction at `isolation`.
    ///
    /// `SQLite` only offers serializable transactions; `BEGIN IMMEDIATE` takes
    /// the write lock up front so concurrent writers queue instead of failing
    /// on lock upgrade.
    #[must_use]
    pub fn begin_statement(self, isolation: IsolationLevel) -> String {
        match self {
            Self::Sqlite => "BEGIN IMMEDIATE".to_string(),
            Self::Postgres => format!("BEGIN ISOLATION LEVEL {}", isolation.as_sql()),
            Self::MySql => format!(
                "SET TRANSACTION ISOLATION LEVEL {}; START TRANSACTION",
                isolation.as_sql()
            ),
        }
    }

    /// `INSERT INTO table (...) VALUES (...)`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or an empty column list.
    pub fn insert(self, table: &'static str, columns: Columns) -> Result<Statement, DialectError> {
        let mut w = Writer::new(self);
        w.insert_values(table, columns)?;
        Ok(w.finish())
    }

    /// Insert, or update the non-key columns when `conflict` already exists.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or an empty column list.
    pub fn upsert(
        self,
        table: &'static str,
        conflict: &[&'static str],
        columns: Columns,
    ) -> Result<Statement, DialectError> {
        let refresh: Vec<&'static str> = columns
            .iter()
            .map(|(column, _)| *column)
            .filter(|column| !conflict.contains(column))
            .collect();

        let mut w = Writer::new(self);
        w.insert_values(table, columns)?;
        match self {
            Self::Sqlite | Self::Postgres => {
                w.push(" ON CONFLICT (");
                w.idents(conflict)?;
                if refresh.is_empty() {
                    w.push(") DO NOTHING");
                } else {
                    w.push(") DO UPDATE SET ");
                    for (i, column) in refresh.iter().enumerate() {
                        if i > 0 {
                            w.push(", ");
                        }
                        let quoted = self.quote(column)?;
                        w.push(&format!("{quoted} = excluded.{quoted}"));
                    }
                }
            }
            Self::MySql => {
                w.push(" ON DUPLICATE KEY UPDATE ");
                if refresh.is_empty() {
                    let quoted = self.quote(conflict.first().ok_or(DialectError::NoColumns)?)?;
                    w.push(&format!("{quoted} = {quoted}"));
                } else {
                    for (i, column) in refresh.iter().enumerate() {
                        if i > 0 {
                            w.push(", ");
                        }
                        let quoted = self.quote(column)?;
                        w.push(&format!("{quoted} = VALUES({quoted})"));
                    }
                }
            }
        }
        Ok(w.finish())
    }

    /// `UPDATE table SET ... WHERE ...`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or an empty `set` list.
    pub fn update(
        self,
        table: &'static str,
        set: Columns,
        filter: Vec<Condition>,
    ) -> Result<Statement, DialectError> {
        if set.is_empty() {
            return Err(DialectError::NoColumns);
        }
        let mut w = Writer::new(self);
        w.push("UPDATE ");
        w.ident(table)?;
        w.push(" SET ");
        for (i, (column, value)) in set.into_iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.ident(column)?;
            w.push(" = ");
            w.value(value);
        }
        w.conditions(filter)?;
        Ok(w.finish())
    }

    /// `UPDATE table SET column = column + 1 WHERE ...`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier.
    pub fn increment(
        self,
        table: &'static str,
        column: &'static str,
        filter: Vec<Condition>,
    ) -> Result<Statement, DialectError> {
        let quoted = self.quote(column)?;
        let mut w = Writer::new(self);
        w.push("UPDATE ");
        w.ident(table)?;
        w.push(&format!(" SET {quoted} = {quoted} + 1"));
        w.conditions(filter)?;
        Ok(w.finish())
    }

    /// `DELETE FROM table WHERE ...`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier.
    pub fn delete(
        self,
        table: &'static str,
        filter: Vec<Condition>,
    ) -> Result<Statement, DialectError> {
        let mut w = Writer::new(self);
        w.push("DELETE FROM ");
        w.ident(table)?;
        w.conditions(filter)?;
        Ok(w.finish())
    }

    /// Render a [`Select`].
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier.
    pub fn select(self, select: Select) -> Result<Statement, DialectError> {
        let mut w = Writer::new(self);
        w.select(select)?;
        Ok(w.finish())
    }

    fn like_operator(self) -> &'static str {
        match self {
            Self::Sqlite | Self::Postgres => " LIKE ",
            Self::MySql => " LIKE BINARY ",
        }
    }

    fn like_escape(self) -> &'static str {
        match self {
            Self::Sqlite | Self::Postgres => r" ESCAPE '\'",
            Self::MySql => r" ESCAPE '\\'",
        }
    }
}

fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Accumulates SQL text and arguments so placeholders stay numbered across
/// nested subqueries.
struct Writer {
    dialect: Dialect,
    sql: String,
    args: Vec<SqlValue>,
}

impl Writer {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            args: Vec::new(),
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            args: self.args,
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn ident(&mut self, ident: &str) -> Result<(), DialectError> {
        let quoted = self.dialect.quote(ident)?;
        self.sql.push_str(&quoted);
        Ok(())
    }

    fn idents(&mut self, idents: &[&str]) -> Result<(), DialectError> {
        if idents.is_empty() {
            return Err(DialectError::NoColumns);
        }
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(ident)?;
        }
        Ok(())
    }

    fn value(&mut self, value: SqlValue) {
        self.args.push(value);
        match self.dialect {
            Dialect::Postgres => {
                let n = self.args.len();
                self.sql.push_str(&format!("${n}"));
            }
            Dialect::Sqlite | Dialect::MySql => self.sql.push('?'),
        }
    }

    fn insert_values(&mut self, table: &'static str, columns: Columns) -> Result<(), DialectError> {
        if columns.is_empty() {
            return Err(DialectError::NoColumns);
        }
        let (names, values): (Vec<&'static str>, Vec<SqlValue>) = columns.into_iter().unzip();
        self.push("INSERT INTO ");
        self.ident(table)?;
        self.push(" (");
        self.idents(&names)?;
        self.push(") VALUES (");
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.value(value);
        }
        self.push(")");
        Ok(())
    }

    fn conditions(&mut self, filter: Vec<Condition>) -> Result<(), DialectError> {
        for (i, condition) in filter.into_iter().enumerate() {
            self.push(if i == 0 { " WHERE " } else { " AND " });
            self.condition(condition)?;
        }
        Ok(())
    }

    fn condition(&mut self, condition: Condition) -> Result<(), DialectError> {
        match condition {
            Condition::Eq(column, value) => self.comparison(column, " = ", value),
            Condition::Gt(column, value) => self.comparison(column, " > ", value),
            Condition::Lt(column, value) => self.comparison(column, " < ", value),
            Condition::StartsWith(column, prefix) => match self.dialect {
                Dialect::Sqlite => {
                    let chars = i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX);
                    self.push("substr(");
                    self.ident(column)?;
                    self.push(", 1, ");
                    self.value(SqlValue::Int(chars));
                    self.push(") = ");
                    self.value(SqlValue::Text(prefix));
                    Ok(())
                }
                Dialect::Postgres | Dialect::MySql => {
                    self.ident(column)?;
                    self.push(self.dialect.like_operator());
                    self.value(SqlValue::Text(escape_like(&prefix)));
                    self.push(self.dialect.like_escape());
                    Ok(())
                }
            },
            Condition::In(column, select) => {
                self.ident(column)?;
                self.push(" IN (");
                self.select(*select)?;
                self.push(")");
                Ok(())
            }
        }
    }

    fn comparison(
        &mut self,
        column: &'static str,
        operator: &str,
        value: SqlValue,
    ) -> Result<(), DialectError> {
        self.ident(column)?;
        self.push(operator);
        self.value(value);
        Ok(())
    }

    fn select(&mut self, select: Select) -> Result<(), DialectError> {
        self.push("SELECT ");
        if select.columns.is_empty() {
            self.push("*");
        } else {
            self.idents(&select.columns)?;
        }
        self.push(" FROM ");
        self.ident(select.table)?;
        self.conditions(select.filter)?;

        for (i, (column, order)) in select.order.into_iter().enumerate() {
            self.push(if i == 0 { " ORDER BY " } else { ", " });
            self.ident(column)?;
            self.push(match order {
                Order::Asc => " ASC",
                Order::Desc => " DESC",
            });
        }

        match (select.limit, select.offset) {
            (Some(limit), offset) => {
                self.push(" LIMIT ");
                self.value(SqlValue::Int(limit));
                if let Some(offset) = offset {
                    self.push(" OFFSET ");
                    self.value(SqlValue::Int(offset));
                }
            }
            (None, Some(offset)) => {
                // SQLite and MySQL only accept OFFSET after a LIMIT.
                match self.dialect {
                    Dialect::Sqlite => self.push(" LIMIT -1"),
                    Dialect::MySql => self.push(" LIMIT 18446744073709551615"),
                    Dialect::Postgres => {}
                }
                self.push(" OFFSET ");
                self.value(SqlValue::Int(offset));
            }
            (None, None) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Columns {
        vec![
            ("guid", SqlValue::from("g1")),
            ("group", SqlValue::from("grp")),
            ("version", SqlValue::Int(3)),
        ]
    }

    #[test]
    fn should_parse_supported_engines() {
        assert_eq!("sqlite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::MySql);
    }

    #[test]
    fn should_reject_unsupported_engine() {
        assert_eq!(
            "oracle".parse::<Dialect>(),
            Err(DialectError::UnsupportedEngine("oracle".to_string()))
        );
    }

    #[test]
    fn should_parse_isolation_levels_in_any_spelling() {
        assert_eq!(
            "read-committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "REPEATABLE READ".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn should_render_insert_for_each_engine() {
        let sqlite = Dialect::Sqlite.insert("resource", row()).unwrap();
        assert_eq!(
            sqlite.sql,
            r#"INSERT INTO "resource" ("guid", "group", "version") VALUES (?, ?, ?)"#
        );
        assert_eq!(sqlite.args.len(), 3);

        let postgres = Dialect::Postgres.insert("resource", row()).unwrap();
        assert_eq!(
            postgres.sql,
            r#"INSERT INTO "resource" ("guid", "group", "version") VALUES ($1, $2, $3)"#
        );

        let mysql = Dialect::MySql.insert("resource", row()).unwrap();
        assert_eq!(
            mysql.sql,
            "INSERT INTO `resource` (`guid`, `group`, `version`) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn should_render_upsert_idioms() {
        let sqlite = Dialect::Sqlite
            .upsert("resource_version", &["group"], row())
            .unwrap();
        assert!(sqlite.sql.ends_with(
            r#"ON CONFLICT ("group") DO UPDATE SET "guid" = excluded."guid", "version" = excluded."version""#
        ));

        let mysql = Dialect::MySql
            .upsert("resource_version", &["group"], row())
            .unwrap();
        assert!(mysql.sql.ends_with(
            "ON DUPLICATE KEY UPDATE `guid` = VALUES(`guid`), `version` = VALUES(`version`)"
        ));
    }

    #[test]
    fn should_do_nothing_when_upsert_has_only_key_columns() {
        let columns = vec![("guid", SqlValue::from("g1"))];
        let postgres = Dialect::Postgres
            .upsert("resource_label", &["guid"], columns.clone())
            .unwrap();
        assert!(postgres.sql.ends_with(r#"ON CONFLICT ("guid") DO NOTHING"#));

        let mysql = Dialect::MySql
            .upsert("resource_label", &["guid"], columns)
            .unwrap();
        assert!(mysql.sql.ends_with("ON DUPLICATE KEY UPDATE `guid` = `guid`"));
    }

    #[test]
    fn should_number_postgres_placeholders_across_set_and_where() {
        let statement = Dialect::Postgres
            .update(
                "resource",
                vec![("version", SqlValue::Int(4))],
                vec![Condition::eq("guid", "g1"), Condition::eq("version", 0_i64)],
            )
            .unwrap();
        assert_eq!(
            statement.sql,
            r#"UPDATE "resource" SET "version" = $1 WHERE "guid" = $2 AND "version" = $3"#
        );
        assert_eq!(
            statement.args,
            vec![SqlValue::Int(4), SqlValue::from("g1"), SqlValue::Int(0)]
        );
    }

    #[test]
    fn should_render_increment() {
        let statement = Dialect::Sqlite
            .increment(
                "resource_version",
                "resource_version",
                vec![Condition::eq("namespace", "ns")],
            )
            .unwrap();
        assert_eq!(
            statement.sql,
            r#"UPDATE "resource_version" SET "resource_version" = "resource_version" + 1 WHERE "namespace" = ?"#
        );
    }

    #[test]
    fn should_render_select_with_subquery_order_and_paging() {
        let labels = Select::table("resource_label")
            .columns(&["guid"])
            .filter(Condition::eq("label", "team"))
            .filter(Condition::eq("value", "core"));
        let select = Select::table("resource")
            .filter(Condition::eq("namespace", "ns1"))
            .filter(Condition::in_select("guid", labels))
            .order_by("name", Order::Asc)
            .order_by("version", Order::Desc)
            .limit(11)
            .offset(20);

        let statement = Dialect::Postgres.select(select).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "resource" WHERE "namespace" = $1 AND "guid" IN (SELECT "guid" FROM "resource_label" WHERE "label" = $2 AND "value" = $3) ORDER BY "name" ASC, "version" DESC LIMIT $4 OFFSET $5"#
        );
        assert_eq!(statement.args.len(), 5);
    }

    #[test]
    fn should_escape_like_wildcards_in_prefix() {
        let select =
            Select::table("resource").filter(Condition::starts_with("name", r"a_b%c\"));

        let postgres = Dialect::Postgres.select(select.clone()).unwrap();
        assert_eq!(
            postgres.sql,
            r#"SELECT * FROM "resource" WHERE "name" LIKE $1 ESCAPE '\'"#
        );
        assert_eq!(postgres.args, vec![SqlValue::from(r"a\_b\%c\\%")]);

        let mysql = Dialect::MySql.select(select).unwrap();
        assert!(mysql.sql.ends_with(r"`name` LIKE BINARY ? ESCAPE '\\'"));
    }

    #[test]
    fn should_compare_prefix_by_substr_on_sqlite() {
        let select = Select::table("resource")
            .filter(Condition::starts_with("name", "Ål_"))
            .filter(Condition::eq("namespace", "ns1"));

        let statement = Dialect::Sqlite.select(select).unwrap();

        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "resource" WHERE substr("name", 1, ?) = ? AND "namespace" = ?"#
        );
        assert_eq!(
            statement.args,
            vec![SqlValue::Int(3), SqlValue::from("Ål_"), SqlValue::from("ns1")]
        );
    }

    #[test]
    fn should_emit_limit_before_bare_offset_where_required() {
        let select = Select::table("resource").offset(5);
        assert!(
            Dialect::Sqlite
                .select(select.clone())
                .unwrap()
                .sql
                .ends_with("LIMIT -1 OFFSET ?")
        );
        assert!(
            Dialect::Postgres
                .select(select)
                .unwrap()
                .sql
                .ends_with(r#""resource" OFFSET $1"#)
        );
    }

    #[test]
    fn should_reject_invalid_identifiers() {
        let result = Dialect::Sqlite.delete("resource; DROP TABLE x", vec![]);
        assert!(matches!(result, Err(DialectError::InvalidIdentifier(_))));
        assert!(Dialect::MySql.quote("1abc").is_err());
        assert!(Dialect::MySql.quote("").is_err());
    }

    #[test]
    fn should_reject_empty_column_lists() {
        assert_eq!(
            Dialect::Sqlite.insert("resource", vec![]),
            Err(DialectError::NoColumns)
        );
        assert_eq!(
            Dialect::Sqlite.update("resource", vec![], vec![]),
            Err(DialectError::NoColumns)
        );
    }

    #[test]
    fn should_render_begin_statement_per_engine() {
        assert_eq!(
            Dialect::Sqlite.begin_statement(IsolationLevel::ReadCommitted),
            "BEGIN IMMEDIATE"
        );
        assert_eq!(
            Dialect::Postgres.begin_statement(IsolationLevel::RepeatableRead),
            "BEGIN ISOLATION LEVEL REPEATABLE READ"
        );
        assert_eq!(
            Dialect::MySql.begin_statement(IsolationLevel::Serializable),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE; START TRANSACTION"
        );
    }
}
