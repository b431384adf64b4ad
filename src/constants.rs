use std::time::Duration;

// Configuration file name
pub const CONFIG_FILENAME: &str = "vpc.yaml";

// Database connection defaults
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "vpc";
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// Migration lock management
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Version table location
pub const VERSION_TABLE_SCHEMA: &str = "public";
pub const VERSION_TABLE_NAME: &str = "vpc_schema_migrations";

// Migration asset naming: {version}_{description}.{up|down}.sql
pub const SCRIPT_EXTENSION: &str = ".sql";
pub const UP_MARKER: &str = "up";
pub const DOWN_MARKER: &str = "down";

// In-script directives, e.g. `-- vpc:mode="non-transactional"`
pub const DIRECTIVE_PREFIX: &str = "-- vpc:";
