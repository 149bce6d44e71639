//! SQL differences between the databases the tool can run against.
//!
//! Production variation databases are MySQL. SQLite is supported for local
//! dry runs against a dump and for the integration tests; both go through
//! `sqlx::Any`, so every column read back is cast to a type the Any driver
//! decodes the same way on both backends.
use crate::{DedupError, Result};
use url::Url;

/// One column of a source table as SQLite reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    /// 1-based position in the primary key, 0 when not part of it
    pub pk_position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    /// Detect the dialect from a connection URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| DedupError::Config(format!("Invalid database URL: {}", e)))?;
        match parsed.scheme() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(DedupError::Config(format!(
                "Unsupported database scheme '{}' (expected mysql or sqlite)",
                other
            ))),
        }
    }

    pub fn insert_ignore(&self) -> &'static str {
        match self {
            Dialect::MySql => "INSERT IGNORE INTO",
            Dialect::Sqlite => "INSERT OR IGNORE INTO",
        }
    }

    pub fn update_ignore(&self) -> &'static str {
        match self {
            Dialect::MySql => "UPDATE IGNORE",
            Dialect::Sqlite => "UPDATE OR IGNORE",
        }
    }

    /// Expression reading an integer id column as a 64-bit signed value.
    pub fn id_expr(&self, column: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({} AS SIGNED)", column),
            Dialect::Sqlite => format!("CAST({} AS INTEGER)", column),
        }
    }

    /// Expression reading a free-text column as a string.
    pub fn text_expr(&self, column: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({} AS CHAR)", column),
            Dialect::Sqlite => format!("CAST({} AS TEXT)", column),
        }
    }

    /// Statements creating the mapping table and its two non-unique indexes.
    pub fn mapping_table_ddl(&self, table: &str) -> Vec<String> {
        match self {
            Dialect::MySql => vec![format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                 old_phenotype_id INT(10) UNSIGNED NOT NULL, \
                 new_phenotype_id INT(10) UNSIGNED NOT NULL, \
                 KEY old_phenotype_idx (old_phenotype_id), \
                 KEY new_phenotype_idx (new_phenotype_id))",
                t = table
            )],
            Dialect::Sqlite => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {t} (\
                     old_phenotype_id INTEGER NOT NULL, \
                     new_phenotype_id INTEGER NOT NULL)",
                    t = table
                ),
                format!(
                    "CREATE INDEX IF NOT EXISTS {t}_old_idx ON {t} (old_phenotype_id)",
                    t = table
                ),
                format!(
                    "CREATE INDEX IF NOT EXISTS {t}_new_idx ON {t} (new_phenotype_id)",
                    t = table
                ),
            ],
        }
    }

    /// Query listing the columns of a table, for backends without
    /// `CREATE TABLE .. LIKE`. Rows are `(name, type, not null, pk position)`.
    pub fn source_columns_query(&self) -> Option<&'static str> {
        match self {
            Dialect::MySql => None,
            Dialect::Sqlite => Some(
                "SELECT CAST(name AS TEXT), CAST(type AS TEXT), \
                 CAST(\"notnull\" AS INTEGER), CAST(pk AS INTEGER) \
                 FROM pragma_table_info(?) ORDER BY cid",
            ),
        }
    }

    /// DDL for a structural copy of `source` named `target`.
    ///
    /// The copy keeps columns, NOT NULL and the primary key (insert-ignore
    /// depends on it) but no foreign keys: backup rows keep pointing at ids
    /// the run deletes. MySQL's `LIKE` behaves the same way; SQLite needs the
    /// source's columns and rebuilds the table from them.
    pub fn clone_table_ddl(
        &self,
        source: &str,
        target: &str,
        columns: &[SourceColumn],
    ) -> Result<String> {
        match self {
            Dialect::MySql => Ok(format!(
                "CREATE TABLE IF NOT EXISTS {} LIKE {}",
                target, source
            )),
            Dialect::Sqlite => {
                if columns.is_empty() {
                    return Err(DedupError::Schema(format!(
                        "Table '{}' does not exist",
                        source
                    )));
                }
                let mut definitions: Vec<String> = columns
                    .iter()
                    .map(|column| {
                        let mut definition = quote_identifier(&column.name);
                        if !column.data_type.is_empty() {
                            definition.push(' ');
                            definition.push_str(&column.data_type);
                        }
                        if column.not_null {
                            definition.push_str(" NOT NULL");
                        }
                        definition
                    })
                    .collect();

                let mut key: Vec<&SourceColumn> =
                    columns.iter().filter(|c| c.pk_position > 0).collect();
                key.sort_by_key(|c| c.pk_position);
                if !key.is_empty() {
                    let names: Vec<String> =
                        key.iter().map(|c| quote_identifier(&c.name)).collect();
                    definitions.push(format!("PRIMARY KEY ({})", names.join(", ")));
                }

                Ok(format!(
                    "CREATE TABLE IF NOT EXISTS {} ({})",
                    target,
                    definitions.join(", ")
                ))
            }
        }
    }

    /// Query listing which of three tables sit on a storage engine that
    /// ignores transactions. `None` when every table is transactional.
    pub fn non_transactional_tables_query(&self) -> Option<&'static str> {
        match self {
            Dialect::MySql => Some(
                "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name IN (?, ?, ?) \
                 AND UPPER(engine) NOT IN ('INNODB', 'NDBCLUSTER') \
                 ORDER BY table_name",
            ),
            Dialect::Sqlite => None,
        }
    }

    pub fn table_exists_query(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "SELECT CAST(COUNT(*) AS SIGNED) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
            Dialect::Sqlite => {
                "SELECT CAST(COUNT(*) AS INTEGER) FROM sqlite_master \
                 WHERE type = 'table' AND name = ?"
            }
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
