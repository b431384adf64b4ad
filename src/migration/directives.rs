use crate::constants::DIRECTIVE_PREFIX;
use crate::error::LoadError;
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::time::Duration;

/// How a script is executed against the database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    /// Script and version update share one transaction, rolled back together on error
    #[default]
    Transactional,

    /// Script runs on its own (CREATE INDEX CONCURRENTLY and friends refuse to
    /// run inside a transaction block). The version update follows as a
    /// separate statement, so a failure in between leaves the record dirty.
    NonTransactional,
}

/// Settings declared inside a script with `-- vpc:` comment lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptDirectives {
    pub mode: TransactionMode,
    pub timeout: Option<Duration>,
}

/// Parse `-- vpc:key="value"` directives from a script.
///
/// Several pairs may share a line: `-- vpc:mode="non-transactional" timeout="5m"`.
pub fn parse_directives(asset: &str, sql: &str) -> Result<ScriptDirectives, LoadError> {
    let mut directives = ScriptDirectives::default();

    for (idx, line) in sql.lines().enumerate() {
        let Some(rest) = line.trim_start().strip_prefix(DIRECTIVE_PREFIX) else {
            continue;
        };

        let invalid = |reason: String| LoadError::InvalidDirective {
            asset: asset.to_string(),
            line: idx + 1,
            reason,
        };

        for (key, value) in parse_key_value_pairs(rest.trim()).map_err(|e| invalid(e.to_string()))? {
            match key.as_str() {
                "mode" => {
                    directives.mode =
                        parse_transaction_mode(&value).map_err(|e| invalid(e.to_string()))?
                }
                "timeout" => {
                    directives.timeout =
                        Some(parse_duration(&value).map_err(|e| invalid(e.to_string()))?)
                }
                _ => return Err(invalid(format!("unknown directive '{}'", key))),
            }
        }
    }

    Ok(directives)
}

/// Parse multiple key="value" pairs from a string
fn parse_key_value_pairs(input: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&ch) = chars.peek() {
            if ch == '=' {
                chars.next();
                break;
            }
            if ch.is_whitespace() {
                return Err(anyhow!("Expected '=' after key '{}'", key));
            }
            key.push(ch);
            chars.next();
        }

        if key.is_empty() {
            return Err(anyhow!("Expected a key before '='"));
        }

        if chars.next() != Some('"') {
            return Err(anyhow!("Expected '\"' after '{}='", key));
        }

        let mut value = String::new();
        let mut closed = false;
        for ch in chars.by_ref() {
            if ch == '"' {
                closed = true;
                break;
            }
            value.push(ch);
        }

        if !closed {
            return Err(anyhow!("Missing closing quote for value of '{}'", key));
        }

        pairs.push((key, value));
    }

    Ok(pairs)
}

fn parse_transaction_mode(s: &str) -> Result<TransactionMode> {
    match s.to_lowercase().as_str() {
        "transactional" => Ok(TransactionMode::Transactional),
        "non-transactional" => Ok(TransactionMode::NonTransactional),
        _ => Err(anyhow!("Unknown transaction mode: {}", s)),
    }
}

/// Parse duration strings like "30s", "5m", "2h", "500ms", "1m30s"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let mut total = Duration::ZERO;
    let mut num_str = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() {
            num_str.push(ch);
        } else if ch.is_alphabetic() {
            let num: u64 = num_str
                .parse()
                .with_context(|| format!("Invalid duration number in '{}'", s))?;

            let unit = if ch == 'm' && chars.peek() == Some(&'s') {
                chars.next();
                Some(Duration::from_millis(num))
            } else {
                match ch {
                    's' => Some(Duration::from_secs(num)),
                    'm' => num.checked_mul(60).map(Duration::from_secs),
                    'h' => num.checked_mul(3600).map(Duration::from_secs),
                    _ => return Err(anyhow!("Unknown duration unit: {}", ch)),
                }
            };

            total = unit
                .and_then(|unit| total.checked_add(unit))
                .ok_or_else(|| anyhow!("Duration too large: {}", s))?;
            num_str.clear();
        } else if !ch.is_whitespace() {
            return Err(anyhow!("Invalid character in duration: {}", ch));
        }
    }

    if !num_str.is_empty() {
        return Err(anyhow!("Duration missing unit: {}", num_str));
    }

    if total.is_zero() {
        return Err(anyhow!("Invalid duration: {}", s));
    }

    Ok(total)
}
