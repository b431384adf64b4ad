use crate::config::types::*;

/// Trait for merging optional configuration values
pub trait Merge<T> {
    fn merge(self, other: T) -> T;
}

impl<T> Merge<Option<T>> for Option<T> {
    fn merge(self, other: Option<T>) -> Option<T> {
        other.or(self)
    }
}

impl Merge<ConfigInput> for ConfigInput {
    fn merge(self, other: ConfigInput) -> ConfigInput {
        ConfigInput {
            database: match (self.database, other.database) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (a, b) => b.or(a),
            },
            migration: match (self.migration, other.migration) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (a, b) => b.or(a),
            },
        }
    }
}

// Field-by-field merges, `other` wins
impl DatabaseInput {
    pub fn merge_with(self, other: DatabaseInput) -> DatabaseInput {
        DatabaseInput {
            host: self.host.merge(other.host),
            port: self.port.merge(other.port),
            database: self.database.merge(other.database),
            user: self.user.merge(other.user),
            password: self.password.merge(other.password),
            connect_timeout: self.connect_timeout.merge(other.connect_timeout),
        }
    }
}

impl MigrationInput {
    pub fn merge_with(self, other: MigrationInput) -> MigrationInput {
        MigrationInput {
            version_table: match (self.version_table, other.version_table) {
                (Some(a), Some(b)) => Some(VersionTableInput {
                    schema: a.schema.merge(b.schema),
                    name: a.name.merge(b.name),
                }),
                (a, b) => b.or(a),
            },
            lock_timeout: self.lock_timeout.merge(other.lock_timeout),
            lock_poll_interval: self.lock_poll_interval.merge(other.lock_poll_interval),
        }
    }
}
