use crate::cli::output::{create_standard_table, header_cell, info, section_header, success, warning};
use crate::core::planner::{DedupPlan, ExactDuplicate, PhenotypeMapping};
use crate::Result;
use comfy_table::Cell;
use serde::Serialize;
use std::path::Path;

/// Rows affected in each phenotype table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub phenotype_feature: u64,
    pub phenotype: u64,
    pub phenotype_ontology_accession: u64,
}

impl TableCounts {
    pub fn total(&self) -> u64 {
        self.phenotype_feature + self.phenotype + self.phenotype_ontology_accession
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub total_phenotypes: usize,
    pub skipped_null: usize,
    pub duplicate_groups: usize,
    pub duplicates_found: usize,
    pub mappings: Vec<PhenotypeMapping>,
    pub exact_duplicates: Vec<ExactDuplicate>,
    pub backed_up: TableCounts,
    pub updated: TableCounts,
    pub deleted: TableCounts,
    pub dry_run: bool,
    pub mapping_table_dropped: bool,
}

impl DedupReport {
    pub fn from_plan(plan: &DedupPlan) -> Self {
        Self {
            total_phenotypes: plan.total_rows,
            skipped_null: plan.skipped_null,
            duplicate_groups: plan.groups.len(),
            duplicates_found: plan.superseded_count(),
            mappings: plan.mappings.clone(),
            exact_duplicates: plan.exact_duplicates.clone(),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::DedupError::Io(e.into()))
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// (table, [backed up, updated, deleted]) rows for the summary table.
    fn per_table(&self) -> [(&'static str, [u64; 3]); 3] {
        let column = |pick: fn(&TableCounts) -> u64| {
            [pick(&self.backed_up), pick(&self.updated), pick(&self.deleted)]
        };
        [
            ("phenotype_feature", column(|c| c.phenotype_feature)),
            ("phenotype", column(|c| c.phenotype)),
            (
                "phenotype_ontology_accession",
                column(|c| c.phenotype_ontology_accession),
            ),
        ]
    }

    /// Print the run summary to stdout.
    pub fn render(&self) {
        section_header("Phenotype deduplication");

        info(&format!(
            "{} phenotypes scanned ({} without description)",
            self.total_phenotypes, self.skipped_null
        ));

        for exact in &self.exact_duplicates {
            warning(&format!(
                "Identical description {:?} shared by ids {:?}",
                exact.description, exact.ids
            ));
        }

        if self.duplicates_found == 0 {
            success("No duplicate phenotypes found");
            if self.mapping_table_dropped {
                info("Removed unused mapping table");
            }
            return;
        }

        info(&format!(
            "{} duplicates found in {} groups",
            self.duplicates_found, self.duplicate_groups
        ));

        if self.dry_run {
            for mapping in &self.mappings {
                println!(
                    "  {} -> {}",
                    mapping.old_phenotype_id, mapping.new_phenotype_id
                );
            }
            info("Dry run mode - no rows were changed.");
            return;
        }

        let mut table = create_standard_table();
        table.set_header(vec![
            header_cell("Table"),
            header_cell("Backed up"),
            header_cell("Updated"),
            header_cell("Deleted"),
        ]);
        for (name, counts) in self.per_table() {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(counts[0]),
                Cell::new(counts[1]),
                Cell::new(counts[2]),
            ]);
        }
        println!("{}", table);

        success(&format!(
            "Merged {} duplicate phenotypes ({} dependent rows repointed)",
            self.deleted.phenotype, self.updated.total()
        ));
    }
}
