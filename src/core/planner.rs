//! In-memory deduplication plan: rows -> duplicate groups -> id mappings.
//!
//! Nothing in here touches the database. The deduplicator loads rows, hands
//! them to [`plan`], and only persists the resulting mappings when the plan
//! is non-empty.
use crate::core::normalize::{canonical_sort_key, normalize_description};
use crate::storage::adaptor::PhenotypeRow;
use serde::Serialize;
use std::collections::HashMap;

/// One old -> new phenotype id rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PhenotypeMapping {
    pub old_phenotype_id: i64,
    pub new_phenotype_id: i64,
}

/// Rows sharing a normalized key. `members[0]` is the canonical row.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub members: Vec<PhenotypeRow>,
}

impl DuplicateGroup {
    pub fn canonical(&self) -> &PhenotypeRow {
        &self.members[0]
    }

    pub fn superseded(&self) -> &[PhenotypeRow] {
        &self.members[1..]
    }
}

/// Several ids carrying a byte-identical description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExactDuplicate {
    pub description: String,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupPlan {
    pub total_rows: usize,
    pub skipped_null: usize,
    pub groups: Vec<DuplicateGroup>,
    pub mappings: Vec<PhenotypeMapping>,
    pub exact_duplicates: Vec<ExactDuplicate>,
}

impl DedupPlan {
    /// True when no normalized key had more than one row.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn superseded_count(&self) -> usize {
        self.mappings.len()
    }
}

/// Build the deduplication plan for `rows`.
///
/// Rows are expected in ascending id order; that order breaks ties between
/// members with equal sort keys. Rows with identical description strings are
/// reported as [`ExactDuplicate`] and still grouped one by one, so every id
/// ends up either canonical or mapped. When the winning description is
/// stored under several ids, the highest of them stays canonical.
pub fn plan(rows: Vec<PhenotypeRow>) -> DedupPlan {
    let total_rows = rows.len();
    let mut skipped_null = 0;

    let mut exact: Vec<ExactDuplicate> = Vec::new();
    let mut exact_index: HashMap<String, usize> = HashMap::new();

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(description) = row.description.as_deref() else {
            skipped_null += 1;
            continue;
        };

        match exact_index.get(description) {
            Some(&idx) => exact[idx].ids.push(row.id),
            None => {
                exact_index.insert(description.to_string(), exact.len());
                exact.push(ExactDuplicate {
                    description: description.to_string(),
                    ids: vec![row.id],
                });
            }
        }

        let key = normalize_description(description);
        match group_index.get(&key) {
            Some(&idx) => groups[idx].members.push(row),
            None => {
                group_index.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    members: vec![row],
                });
            }
        }
    }

    let exact_duplicates = exact.into_iter().filter(|e| e.ids.len() > 1).collect();

    let mut duplicate_groups = Vec::new();
    let mut mappings = Vec::new();
    for mut group in groups.into_iter().filter(|g| g.members.len() > 1) {
        // sort_by_key is stable: equal keys keep id order
        group
            .members
            .sort_by_key(|m| canonical_sort_key(m.description.as_deref().unwrap_or_default()));
        promote_last_identical(&mut group.members);

        let canonical = group.canonical().id;
        mappings.extend(group.superseded().iter().map(|m| PhenotypeMapping {
            old_phenotype_id: m.id,
            new_phenotype_id: canonical,
        }));
        duplicate_groups.push(group);
    }

    DedupPlan {
        total_rows,
        skipped_null,
        groups: duplicate_groups,
        mappings,
        exact_duplicates,
    }
}

/// Move the last member whose description equals the front member's to the
/// front. Identical strings share a sort key, so they sit in id order.
fn promote_last_identical(members: &mut [PhenotypeRow]) {
    let Some(front) = members.first().map(|m| m.description.clone()) else {
        return;
    };
    if let Some(pos) = members.iter().rposition(|m| m.description == front) {
        members[..=pos].rotate_right(1);
    }
}
