//! Data-access boundary for the phenotype tables.
//!
//! Everything is keyed by the numeric phenotype id and runs on the attached
//! connection (or an open transaction deref'd to one).
use crate::storage::dialect::Dialect;
use crate::Result;
use serde::Serialize;
use sqlx::AnyConnection;

pub const PHENOTYPE: &str = "phenotype";
pub const PHENOTYPE_FEATURE: &str = "phenotype_feature";
pub const PHENOTYPE_ONTOLOGY_ACCESSION: &str = "phenotype_ontology_accession";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhenotypeRow {
    pub id: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhenotypeFeatureRow {
    pub phenotype_feature_id: i64,
    pub phenotype_id: i64,
    pub object_id: Option<String>,
}

pub struct PhenotypeAdaptor<'c> {
    conn: &'c mut AnyConnection,
    dialect: Dialect,
}

impl<'c> PhenotypeAdaptor<'c> {
    pub fn new(conn: &'c mut AnyConnection, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    /// All phenotype rows, ascending by id.
    pub async fn fetch_all(&mut self) -> Result<Vec<PhenotypeRow>> {
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY id",
            self.dialect.id_expr("id"),
            self.dialect.text_expr("description"),
            PHENOTYPE
        );
        let rows = sqlx::query_as::<_, (i64, Option<String>)>(&sql)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, description)| PhenotypeRow { id, description })
            .collect())
    }

    pub async fn fetch_by_id(&mut self, id: i64) -> Result<Option<PhenotypeRow>> {
        let sql = format!(
            "SELECT {}, {} FROM {} WHERE id = ?",
            self.dialect.id_expr("id"),
            self.dialect.text_expr("description"),
            PHENOTYPE
        );
        let row = sqlx::query_as::<_, (i64, Option<String>)>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(row.map(|(id, description)| PhenotypeRow { id, description }))
    }

    /// Features annotated with phenotype `phenotype_id`.
    pub async fn fetch_all_by_phenotype(
        &mut self,
        phenotype_id: i64,
    ) -> Result<Vec<PhenotypeFeatureRow>> {
        let sql = format!(
            "SELECT {}, {}, {} FROM {} WHERE phenotype_id = ? ORDER BY phenotype_feature_id",
            self.dialect.id_expr("phenotype_feature_id"),
            self.dialect.id_expr("phenotype_id"),
            self.dialect.text_expr("object_id"),
            PHENOTYPE_FEATURE
        );
        let rows = sqlx::query_as::<_, (i64, i64, Option<String>)>(&sql)
            .bind(phenotype_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(phenotype_feature_id, phenotype_id, object_id)| PhenotypeFeatureRow {
                phenotype_feature_id,
                phenotype_id,
                object_id,
            })
            .collect())
    }

    /// Ontology accessions linked to `phenotype_id`, fetched on demand.
    pub async fn fetch_ontology_accessions(&mut self, phenotype_id: i64) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE phenotype_id = ? ORDER BY accession",
            self.dialect.text_expr("accession"),
            PHENOTYPE_ONTOLOGY_ACCESSION
        );
        let accessions = sqlx::query_scalar::<_, String>(&sql)
            .bind(phenotype_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(accessions)
    }

    pub async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT {} FROM {}", self.dialect.id_expr("COUNT(*)"), table);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
