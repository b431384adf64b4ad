use crate::constants::{DOWN_MARKER, SCRIPT_EXTENSION, UP_MARKER};
use crate::error::LoadError;
use crate::migration::Direction;

/// Components of an asset name like "1_create_widgets.up.sql"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssetName {
    pub version: u64,
    pub description: String,
    pub direction: Direction,
}

/// Parse a migration asset name of the form `{version}_{description}.{up|down}.sql`.
///
/// Any leading directory is ignored. Returns `Ok(None)` for assets that are not
/// SQL scripts so a bundle can carry READMEs and the like; a `.sql` asset that
/// does not follow the naming scheme is an error rather than silently skipped.
pub fn parse_asset_name(name: &str) -> Result<Option<ParsedAssetName>, LoadError> {
    let filename = name.rsplit('/').next().unwrap_or(name);

    let Some(stem) = filename.strip_suffix(SCRIPT_EXTENSION) else {
        return Ok(None);
    };

    let malformed = |reason: &str| LoadError::MalformedAsset {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let (stem, marker) = stem
        .rsplit_once('.')
        .ok_or_else(|| malformed("expected a '.up.sql' or '.down.sql' suffix"))?;

    let direction = match marker {
        UP_MARKER => Direction::Up,
        DOWN_MARKER => Direction::Down,
        _ => return Err(malformed("expected a '.up.sql' or '.down.sql' suffix")),
    };

    let (version_str, description) = stem
        .split_once('_')
        .ok_or_else(|| malformed("expected '{version}_{description}'"))?;

    if version_str.is_empty() || !version_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("version must be a non-negative integer"));
    }

    let version = version_str
        .parse::<u64>()
        .map_err(|_| malformed("version does not fit in 64 bits"))?;

    // The version table stores BIGINT
    if i64::try_from(version).is_err() {
        return Err(malformed("version is too large for database storage"));
    }

    if description.is_empty() {
        return Err(malformed("description is empty"));
    }

    Ok(Some(ParsedAssetName {
        version,
        description: description.to_string(),
        direction,
    }))
}
