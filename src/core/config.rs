use crate::DedupError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const DEFAULT_PORT: u16 = 3306;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub tables: TableLayout,
}

/// Connection parameters as they arrive from the config file or the command
/// line. Every field is optional until [`ConnectionConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub db: Option<String>,
}

/// Validated connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub password: String,
    pub database: String,
}

/// Names of the tables a run creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Old -> new phenotype id mapping, kept as an audit trail
    pub mapping_table: String,
    /// Appended to a source table name to form its backup table name
    pub backup_suffix: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            mapping_table: "phenotype_id_mapping".to_string(),
            backup_suffix: "_bak".to_string(),
        }
    }
}

impl TableLayout {
    pub fn backup_table(&self, source: &str) -> String {
        format!("{}{}", source, self.backup_suffix)
    }

    /// Table names are interpolated into SQL, so only plain identifiers pass.
    pub fn validate(&self) -> Result<(), DedupError> {
        if !is_identifier(&self.mapping_table) {
            return Err(DedupError::Config(format!(
                "Invalid mapping table name '{}'",
                self.mapping_table
            )));
        }
        if self.backup_suffix.is_empty()
            || !self
                .backup_suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DedupError::Config(format!(
                "Invalid backup table suffix '{}'",
                self.backup_suffix
            )));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ConnectionConfig {
    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: ConnectionConfig) -> ConnectionConfig {
        ConnectionConfig {
            host: overrides.host.or(self.host),
            user: overrides.user.or(self.user),
            port: overrides.port.or(self.port),
            password: overrides.password.or(self.password),
            db: overrides.db.or(self.db),
        }
    }

    /// Check that every mandatory parameter is present. All missing flags
    /// are reported at once.
    pub fn validate(self) -> Result<ConnectionSettings, DedupError> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        if !present(&self.host) {
            missing.push("--host");
        }
        if !present(&self.user) {
            missing.push("--user");
        }
        // An explicitly empty password is allowed
        if self.password.is_none() {
            missing.push("--password");
        }
        if !present(&self.db) {
            missing.push("--db");
        }

        match (self.host, self.user, self.password, self.db) {
            (Some(host), Some(user), Some(password), Some(database)) if missing.is_empty() => {
                Ok(ConnectionSettings {
                    host,
                    user,
                    port: self.port.unwrap_or(DEFAULT_PORT),
                    password,
                    database,
                })
            }
            _ => Err(DedupError::Config(format!(
                "Missing required connection parameter(s): {}",
                missing.join(", ")
            ))),
        }
    }
}

impl ConnectionSettings {
    /// `mysql://` URL with user and password percent-encoded.
    pub fn to_url(&self) -> Result<String, DedupError> {
        let mut url = Url::parse(&format!("mysql://{}:{}/{}", self.host, self.port, self.database))
            .map_err(|e| DedupError::Config(format!("Invalid connection parameters: {}", e)))?;
        url.set_username(&self.user)
            .map_err(|_| DedupError::Config(format!("Invalid user '{}'", self.user)))?;
        url.set_password(Some(&self.password))
            .map_err(|_| DedupError::Config("Invalid password".to_string()))?;
        Ok(url.to_string())
    }

    /// Connection target without the password, for logging.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, DedupError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| DedupError::Config(format!("Failed to parse config: {}", e)))?;
    config.tables.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), DedupError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| DedupError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
