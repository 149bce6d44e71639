pub mod adaptor;
pub mod dialect;
pub mod schema;

pub use adaptor::{PhenotypeAdaptor, PhenotypeFeatureRow, PhenotypeRow};
pub use dialect::Dialect;

use crate::{DedupError, Result};
use sqlx::{AnyConnection, Connection};

/// Open a single connection for the whole run.
pub async fn connect(url: &str) -> Result<(AnyConnection, Dialect)> {
    let dialect = Dialect::from_url(url)?;
    sqlx::any::install_default_drivers();

    let conn = AnyConnection::connect(url)
        .await
        .map_err(|e| DedupError::Connection(e.to_string()))?;
    tracing::debug!("Connected ({:?})", dialect);
    Ok((conn, dialect))
}
