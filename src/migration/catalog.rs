use crate::assets::AssetStore;
use crate::error::LoadError;
use crate::migration::directives::{TransactionMode, parse_directives};
use crate::migration::parsing::parse_asset_name;
use crate::migration::Direction;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// One direction of a migration step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub version: u64,
    pub direction: Direction,
    /// Asset name the script was loaded from
    pub asset: String,
    pub sql: String,
    pub mode: TransactionMode,
    /// Statement timeout declared by the script, if any
    pub timeout: Option<Duration>,
    pub checksum: String,
}

/// A versioned, reversible schema change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub version: u64,
    pub description: String,
    pub up: Script,
    pub down: Script,
}

impl MigrationStep {
    pub fn script(&self, direction: Direction) -> &Script {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Every migration step known to this build, in ascending version order.
///
/// Built once and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    steps: Vec<MigrationStep>,
}

#[derive(Default)]
struct PendingStep {
    description: String,
    up: Option<Script>,
    down: Option<Script>,
}

impl Catalog {
    /// Build the catalog from every script in an asset store.
    ///
    /// Both directions are mandatory for every version.
    pub fn load(store: &dyn AssetStore) -> Result<Self, LoadError> {
        let mut names = store.list_names();
        names.sort();

        let mut pending: BTreeMap<u64, PendingStep> = BTreeMap::new();

        for name in names {
            let Some(parsed) = parse_asset_name(&name)? else {
                debug!("Skipping non-script asset {}", name);
                continue;
            };

            let bytes = store.read_asset(&name)?;
            let sql = String::from_utf8(bytes.into_owned())
                .map_err(|_| LoadError::InvalidEncoding(name.clone()))?;
            let directives = parse_directives(&name, &sql)?;

            let entry = pending.entry(parsed.version).or_default();
            if entry.up.is_none() && entry.down.is_none() {
                entry.description = parsed.description.clone();
            } else if entry.description != parsed.description {
                let existing = entry.up.as_ref().or(entry.down.as_ref());
                return Err(LoadError::DuplicateVersion {
                    version: parsed.version,
                    direction: parsed.direction,
                    first: existing.map(|s| s.asset.clone()).unwrap_or_default(),
                    second: name,
                });
            }

            let slot = match parsed.direction {
                Direction::Up => &mut entry.up,
                Direction::Down => &mut entry.down,
            };

            if let Some(existing) = slot {
                return Err(LoadError::DuplicateVersion {
                    version: parsed.version,
                    direction: parsed.direction,
                    first: existing.asset.clone(),
                    second: name,
                });
            }

            *slot = Some(Script {
                version: parsed.version,
                direction: parsed.direction,
                checksum: format!("{:x}", md5::compute(&sql)),
                asset: name,
                sql,
                mode: directives.mode,
                timeout: directives.timeout,
            });
        }

        let mut steps = Vec::with_capacity(pending.len());
        for (version, entry) in pending {
            match (entry.up, entry.down) {
                (Some(up), Some(down)) => steps.push(MigrationStep {
                    version,
                    description: entry.description,
                    up,
                    down,
                }),
                (Some(only), None) | (None, Some(only)) => {
                    return Err(LoadError::MissingDirection {
                        version,
                        missing: only.direction.opposite(),
                        asset: only.asset,
                    });
                }
                (None, None) => unreachable!("pending entries always hold a script"),
            }
        }

        debug!("Loaded {} migration steps", steps.len());

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Highest version in the catalog
    pub fn latest(&self) -> Option<u64> {
        self.steps.last().map(|s| s.version)
    }

    pub fn get(&self, version: u64) -> Option<&MigrationStep> {
        self.position(version).map(|idx| &self.steps[idx])
    }

    pub fn contains(&self, version: u64) -> bool {
        self.position(version).is_some()
    }

    /// Number of steps applied when the database sits at `version`
    pub(crate) fn applied_count(&self, version: Option<u64>) -> Option<usize> {
        match version {
            None => Some(0),
            Some(v) => self.position(v).map(|idx| idx + 1),
        }
    }

    /// The version the database is left at after `version` is rolled back
    pub fn previous(&self, version: u64) -> Option<u64> {
        let idx = self.position(version)?;
        idx.checked_sub(1).map(|prev| self.steps[prev].version)
    }

    fn position(&self, version: u64) -> Option<usize> {
        self.steps
            .binary_search_by_key(&version, |s| s.version)
            .ok()
    }
}
