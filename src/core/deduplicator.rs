//! Runs a deduplication plan against the database.
//!
//! Stage order:
//! 1. load phenotypes and build the plan in memory
//! 2. no duplicates: drop the mapping table and stop
//! 3. create the mapping and backup tables (outside the transaction, MySQL
//!    commits DDL implicitly)
//! 4. in one transaction: record mappings, back up affected rows, repoint
//!    `phenotype_feature` and `phenotype_ontology_accession`, delete stale
//!    accession rows and superseded phenotypes
//!
//! Tables on a non-transactional MySQL engine (MyISAM) are not covered by
//! the rollback; the run warns about them before it starts writing.
use crate::core::config::TableLayout;
use crate::core::planner::{self, DedupPlan, PhenotypeMapping};
use crate::report::{DedupReport, TableCounts};
use crate::storage::adaptor::{
    PhenotypeAdaptor, PHENOTYPE, PHENOTYPE_FEATURE, PHENOTYPE_ONTOLOGY_ACCESSION,
};
use crate::storage::dialect::Dialect;
use crate::storage::schema;
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::{AnyConnection, Connection};

pub struct Deduplicator<'c> {
    conn: &'c mut AnyConnection,
    dialect: Dialect,
    layout: TableLayout,
    dry_run: bool,
    show_progress: bool,
}

impl<'c> Deduplicator<'c> {
    pub fn new(conn: &'c mut AnyConnection, dialect: Dialect, layout: TableLayout) -> Self {
        Self {
            conn,
            dialect,
            layout,
            dry_run: false,
            show_progress: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Load every phenotype and compute the plan without writing anything.
    pub async fn plan(&mut self) -> Result<DedupPlan> {
        let rows = PhenotypeAdaptor::new(&mut *self.conn, self.dialect)
            .fetch_all()
            .await?;
        tracing::info!("Loaded {} phenotypes", rows.len());

        let plan = planner::plan(rows);
        for exact in &plan.exact_duplicates {
            tracing::warn!(
                "Description {:?} is stored verbatim under ids {:?}",
                exact.description,
                exact.ids
            );
        }
        if plan.skipped_null > 0 {
            tracing::debug!("Skipped {} phenotypes without description", plan.skipped_null);
        }
        tracing::info!(
            "Found {} duplicates in {} groups",
            plan.superseded_count(),
            plan.groups.len()
        );
        Ok(plan)
    }

    pub async fn run(mut self) -> Result<DedupReport> {
        let plan = self.plan().await?;
        let mut report = DedupReport::from_plan(&plan);
        report.dry_run = self.dry_run;

        if plan.is_empty() {
            if !self.dry_run {
                report.mapping_table_dropped =
                    schema::drop_mapping_table(&mut *self.conn, self.dialect, &self.layout).await?;
            }
            return Ok(report);
        }

        if self.dry_run {
            tracing::info!("Dry run, leaving the database untouched");
            return Ok(report);
        }

        schema::create_mapping_table(&mut *self.conn, self.dialect, &self.layout).await?;
        schema::create_backup_tables(&mut *self.conn, self.dialect, &self.layout).await?;

        let pb = self.progress_bar(plan.mappings.len());
        let dialect = self.dialect;
        let layout = self.layout.clone();

        // Rollback only covers transactional engines; MyISAM keeps whatever
        // ran before a failure
        for table in schema::non_transactional_tables(&mut *self.conn, self.dialect).await? {
            tracing::warn!(
                "{} is not on a transactional engine, a failed run cannot be rolled back there",
                table
            );
        }

        // Dropping the transaction on error rolls it back
        let mut tx = self.conn.begin().await?;

        pb.set_message("Recording id mappings");
        record_mappings(&mut tx, &layout, &plan.mappings).await?;

        pb.set_message("Backing up affected rows");
        report.backed_up = backup_affected_rows(&mut tx, dialect, &layout, &plan.mappings).await?;

        pb.set_message("Repointing dependent rows");
        report.updated = repoint_dependents(&mut tx, dialect, &plan.mappings, &pb).await?;

        pb.set_message("Deleting superseded rows");
        report.deleted = delete_superseded(&mut tx, &plan.mappings, &pb).await?;

        tx.commit().await?;
        pb.finish_with_message(format!("Merged {} duplicate phenotypes", plan.superseded_count()));

        tracing::info!(
            "Repointed {} phenotype_feature and {} phenotype_ontology_accession rows",
            report.updated.phenotype_feature,
            report.updated.phenotype_ontology_accession
        );
        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

/// Persist the mappings as an audit trail.
///
/// Any row left for the same old id by an interrupted earlier run is
/// replaced, so the table stays one row per old id.
pub async fn record_mappings(
    conn: &mut AnyConnection,
    layout: &TableLayout,
    mappings: &[PhenotypeMapping],
) -> Result<()> {
    let delete = format!(
        "DELETE FROM {} WHERE old_phenotype_id = ?",
        layout.mapping_table
    );
    let insert = format!(
        "INSERT INTO {} (old_phenotype_id, new_phenotype_id) VALUES (?, ?)",
        layout.mapping_table
    );
    for mapping in mappings {
        sqlx::query(&delete)
            .bind(mapping.old_phenotype_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query(&insert)
            .bind(mapping.old_phenotype_id)
            .bind(mapping.new_phenotype_id)
            .execute(&mut *conn)
            .await?;
    }
    tracing::debug!("Recorded {} mappings in {}", mappings.len(), layout.mapping_table);
    Ok(())
}

/// Copy every row that references a superseded id into its backup table.
///
/// Insert-ignore on the backup tables' keys makes this safe to repeat: a
/// second call copies nothing and reports zero rows.
pub async fn backup_affected_rows(
    conn: &mut AnyConnection,
    dialect: Dialect,
    layout: &TableLayout,
    mappings: &[PhenotypeMapping],
) -> Result<TableCounts> {
    let copy_sql = |source: &str, column: &str| {
        format!(
            "{} {} SELECT * FROM {} WHERE {} = ?",
            dialect.insert_ignore(),
            layout.backup_table(source),
            source,
            column
        )
    };
    let feature_sql = copy_sql(PHENOTYPE_FEATURE, "phenotype_id");
    let phenotype_sql = copy_sql(PHENOTYPE, "id");
    let accession_sql = copy_sql(PHENOTYPE_ONTOLOGY_ACCESSION, "phenotype_id");

    let mut counts = TableCounts::default();
    for mapping in mappings {
        let old = mapping.old_phenotype_id;
        counts.phenotype_feature += sqlx::query(&feature_sql)
            .bind(old)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        counts.phenotype += sqlx::query(&phenotype_sql)
            .bind(old)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        counts.phenotype_ontology_accession += sqlx::query(&accession_sql)
            .bind(old)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    tracing::debug!(
        "Backed up {} phenotype_feature, {} phenotype, {} phenotype_ontology_accession rows",
        counts.phenotype_feature,
        counts.phenotype,
        counts.phenotype_ontology_accession
    );
    Ok(counts)
}

/// Point dependents of every superseded id at its canonical id.
///
/// `phenotype_feature` rows have a single owner and always move. Accession
/// rows that would collide with an accession the canonical phenotype already
/// carries are skipped here and removed by [`delete_superseded`].
async fn repoint_dependents(
    conn: &mut AnyConnection,
    dialect: Dialect,
    mappings: &[PhenotypeMapping],
    pb: &ProgressBar,
) -> Result<TableCounts> {
    let feature_sql = format!(
        "UPDATE {} SET phenotype_id = ? WHERE phenotype_id = ?",
        PHENOTYPE_FEATURE
    );
    let accession_sql = format!(
        "{} {} SET phenotype_id = ? WHERE phenotype_id = ?",
        dialect.update_ignore(),
        PHENOTYPE_ONTOLOGY_ACCESSION
    );

    pb.set_position(0);
    let mut counts = TableCounts::default();
    for mapping in mappings {
        counts.phenotype_feature += sqlx::query(&feature_sql)
            .bind(mapping.new_phenotype_id)
            .bind(mapping.old_phenotype_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        counts.phenotype_ontology_accession += sqlx::query(&accession_sql)
            .bind(mapping.new_phenotype_id)
            .bind(mapping.old_phenotype_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        pb.inc(1);
    }
    Ok(counts)
}

/// Remove accession rows still on a superseded id, then the superseded
/// phenotypes themselves.
async fn delete_superseded(
    conn: &mut AnyConnection,
    mappings: &[PhenotypeMapping],
    pb: &ProgressBar,
) -> Result<TableCounts> {
    let accession_sql = format!(
        "DELETE FROM {} WHERE phenotype_id = ?",
        PHENOTYPE_ONTOLOGY_ACCESSION
    );
    let phenotype_sql = format!("DELETE FROM {} WHERE id = ?", PHENOTYPE);

    pb.set_position(0);
    let mut counts = TableCounts::default();
    for mapping in mappings {
        counts.phenotype_ontology_accession += sqlx::query(&accession_sql)
            .bind(mapping.old_phenotype_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        counts.phenotype += sqlx::query(&phenotype_sql)
            .bind(mapping.old_phenotype_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        pb.inc(1);
    }
    Ok(counts)
}
