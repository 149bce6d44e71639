//! Mapping and backup tables created by a deduplication run.
use crate::core::config::TableLayout;
use crate::storage::adaptor::{PHENOTYPE, PHENOTYPE_FEATURE, PHENOTYPE_ONTOLOGY_ACCESSION};
use crate::storage::dialect::{Dialect, SourceColumn};
use crate::Result;
use sqlx::AnyConnection;

/// Source tables that get a backup copy, in the order they are backed up.
pub const BACKED_UP_TABLES: [&str; 3] = [PHENOTYPE_FEATURE, PHENOTYPE, PHENOTYPE_ONTOLOGY_ACCESSION];

pub async fn table_exists(conn: &mut AnyConnection, dialect: Dialect, table: &str) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(dialect.table_exists_query())
        .bind(table.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn create_mapping_table(
    conn: &mut AnyConnection,
    dialect: Dialect,
    layout: &TableLayout,
) -> Result<()> {
    for statement in dialect.mapping_table_ddl(&layout.mapping_table) {
        sqlx::query(&statement).execute(&mut *conn).await?;
    }
    tracing::debug!("Mapping table {} ready", layout.mapping_table);
    Ok(())
}

/// Create structural copies of the three phenotype tables if absent.
pub async fn create_backup_tables(
    conn: &mut AnyConnection,
    dialect: Dialect,
    layout: &TableLayout,
) -> Result<()> {
    for source in BACKED_UP_TABLES {
        let target = layout.backup_table(source);
        let columns = match dialect.source_columns_query() {
            Some(query) => source_columns(conn, query, source).await?,
            None => Vec::new(),
        };
        let ddl = dialect.clone_table_ddl(source, &target, &columns)?;
        sqlx::query(&ddl).execute(&mut *conn).await?;
        tracing::debug!("Backup table {} ready", target);
    }
    Ok(())
}

async fn source_columns(
    conn: &mut AnyConnection,
    query: &str,
    table: &str,
) -> Result<Vec<SourceColumn>> {
    let rows = sqlx::query_as::<_, (String, String, i64, i64)>(query)
        .bind(table.to_string())
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(name, data_type, not_null, pk_position)| SourceColumn {
            name,
            data_type,
            not_null: not_null != 0,
            pk_position,
        })
        .collect())
}

/// Backed-up tables whose storage engine ignores `BEGIN`/`ROLLBACK`
/// (MyISAM and friends). Always empty on SQLite.
pub async fn non_transactional_tables(
    conn: &mut AnyConnection,
    dialect: Dialect,
) -> Result<Vec<String>> {
    let Some(query) = dialect.non_transactional_tables_query() else {
        return Ok(Vec::new());
    };
    let mut statement = sqlx::query_scalar::<_, String>(query);
    for table in BACKED_UP_TABLES {
        statement = statement.bind(table.to_string());
    }
    Ok(statement.fetch_all(&mut *conn).await?)
}

/// Drop the mapping table. Returns false when there was nothing to drop.
pub async fn drop_mapping_table(
    conn: &mut AnyConnection,
    dialect: Dialect,
    layout: &TableLayout,
) -> Result<bool> {
    if !table_exists(conn, dialect, &layout.mapping_table).await? {
        return Ok(false);
    }
    sqlx::query(&format!("DROP TABLE {}", layout.mapping_table))
        .execute(&mut *conn)
        .await?;
    tracing::info!("Dropped unused mapping table {}", layout.mapping_table);
    Ok(true)
}
