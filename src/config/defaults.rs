use crate::config::types::*;
use crate::constants::*;

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            version_table: VersionTable::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
        }
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self {
            schema: VERSION_TABLE_SCHEMA.to_string(),
            name: VERSION_TABLE_NAME.to_string(),
        }
    }
}
