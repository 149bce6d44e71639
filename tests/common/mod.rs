//! Common test utilities for phenotype-dedup integration tests
//!
//! Every test gets its own in-memory SQLite database with the three
//! phenotype tables, reached through the same `sqlx::Any` path the binary
//! uses against MySQL.
#![allow(dead_code)]

use phenotype_dedup::core::config::TableLayout;
use phenotype_dedup::storage::{schema, Dialect, PhenotypeAdaptor};
use sqlx::{AnyConnection, Connection};
use std::path::Path;

const SCHEMA: &[&str] = &[
    "CREATE TABLE phenotype (
        id INTEGER PRIMARY KEY,
        stable_id TEXT,
        description TEXT
    )",
    "CREATE TABLE phenotype_feature (
        phenotype_feature_id INTEGER PRIMARY KEY,
        phenotype_id INTEGER NOT NULL,
        object_id TEXT
    )",
    "CREATE TABLE phenotype_ontology_accession (
        phenotype_id INTEGER NOT NULL,
        accession TEXT NOT NULL,
        mapped_by_attrib TEXT,
        PRIMARY KEY (phenotype_id, accession)
    )",
];

const SCHEMA_WITH_FOREIGN_KEYS: &[&str] = &[
    "PRAGMA foreign_keys = ON",
    "CREATE TABLE phenotype (
        id INTEGER PRIMARY KEY,
        stable_id TEXT,
        description TEXT
    )",
    "CREATE TABLE phenotype_feature (
        phenotype_feature_id INTEGER PRIMARY KEY,
        phenotype_id INTEGER NOT NULL REFERENCES phenotype(id),
        object_id TEXT
    )",
    "CREATE TABLE phenotype_ontology_accession (
        phenotype_id INTEGER NOT NULL,
        accession TEXT NOT NULL,
        mapped_by_attrib TEXT,
        PRIMARY KEY (phenotype_id, accession),
        FOREIGN KEY (phenotype_id) REFERENCES phenotype(id)
    )",
];

/// Fresh database with the phenotype schema and no rows.
pub async fn memory_db() -> AnyConnection {
    open_with_schema("sqlite::memory:", SCHEMA).await
}

/// Like [`memory_db`], with dependents declaring foreign keys on
/// `phenotype(id)` and enforcement switched on.
pub async fn memory_db_with_foreign_keys() -> AnyConnection {
    open_with_schema("sqlite::memory:", SCHEMA_WITH_FOREIGN_KEYS).await
}

/// Same as [`memory_db`] but backed by a file, for tests that hand the
/// database to the binary.
pub async fn file_db(path: &Path) -> AnyConnection {
    open_with_schema(&sqlite_url(path, "rwc"), SCHEMA).await
}

/// Reopen an existing database file without touching its schema.
pub async fn open_db(path: &Path) -> AnyConnection {
    sqlx::any::install_default_drivers();
    AnyConnection::connect(&sqlite_url(path, "rw"))
        .await
        .expect("Failed to reopen test database")
}

pub fn sqlite_url(path: &Path, mode: &str) -> String {
    format!("sqlite://{}?mode={}", path.display(), mode)
}

async fn open_with_schema(url: &str, schema: &[&str]) -> AnyConnection {
    sqlx::any::install_default_drivers();
    let mut conn = AnyConnection::connect(url)
        .await
        .expect("Failed to open test database");
    for statement in schema {
        sqlx::query(statement)
            .execute(&mut conn)
            .await
            .expect("Failed to create schema");
    }
    conn
}

pub async fn insert_phenotype(conn: &mut AnyConnection, id: i64, description: &str) {
    sqlx::query("INSERT INTO phenotype (id, description) VALUES (?, ?)")
        .bind(id)
        .bind(description.to_string())
        .execute(&mut *conn)
        .await
        .expect("Failed to insert phenotype");
}

pub async fn insert_feature(conn: &mut AnyConnection, id: i64, phenotype_id: i64, object_id: &str) {
    sqlx::query(
        "INSERT INTO phenotype_feature (phenotype_feature_id, phenotype_id, object_id) VALUES (?, ?, ?)",
    )
    .bind(id)
    .bind(phenotype_id)
    .bind(object_id.to_string())
    .execute(&mut *conn)
    .await
    .expect("Failed to insert phenotype_feature");
}

pub async fn insert_accession(conn: &mut AnyConnection, phenotype_id: i64, accession: &str) {
    sqlx::query("INSERT INTO phenotype_ontology_accession (phenotype_id, accession) VALUES (?, ?)")
        .bind(phenotype_id)
        .bind(accession.to_string())
        .execute(&mut *conn)
        .await
        .expect("Failed to insert phenotype_ontology_accession");
}

pub async fn phenotype_ids(conn: &mut AnyConnection) -> Vec<i64> {
    PhenotypeAdaptor::new(conn, Dialect::Sqlite)
        .fetch_all()
        .await
        .expect("Failed to fetch phenotypes")
        .into_iter()
        .map(|row| row.id)
        .collect()
}

/// `phenotype_feature_id`s currently attached to `phenotype_id`.
pub async fn feature_ids(conn: &mut AnyConnection, phenotype_id: i64) -> Vec<i64> {
    PhenotypeAdaptor::new(conn, Dialect::Sqlite)
        .fetch_all_by_phenotype(phenotype_id)
        .await
        .expect("Failed to fetch features")
        .into_iter()
        .map(|row| row.phenotype_feature_id)
        .collect()
}

pub async fn count(conn: &mut AnyConnection, table: &str) -> i64 {
    PhenotypeAdaptor::new(conn, Dialect::Sqlite)
        .count_rows(table)
        .await
        .expect("Failed to count rows")
}

pub async fn table_exists(conn: &mut AnyConnection, table: &str) -> bool {
    schema::table_exists(conn, Dialect::Sqlite, table)
        .await
        .expect("Failed to query sqlite_master")
}

pub async fn mapping_rows(conn: &mut AnyConnection, layout: &TableLayout) -> Vec<(i64, i64)> {
    sqlx::query_as::<_, (i64, i64)>(&format!(
        "SELECT old_phenotype_id, new_phenotype_id FROM {} ORDER BY old_phenotype_id",
        layout.mapping_table
    ))
    .fetch_all(&mut *conn)
    .await
    .expect("Failed to read mapping table")
}

/// Two spellings of type 2 diabetes plus asthma, with features on each.
pub async fn seed_diabetes_example(conn: &mut AnyConnection) {
    insert_phenotype(conn, 1, "Type 2 Diabetes").await;
    insert_phenotype(conn, 2, "type 2 diabetes").await;
    insert_phenotype(conn, 3, "Asthma").await;

    insert_feature(conn, 10, 1, "rs7903146").await;
    insert_feature(conn, 11, 1, "rs12255372").await;
    insert_feature(conn, 12, 2, "rs1801282").await;
    insert_feature(conn, 13, 3, "rs2305480").await;
}
