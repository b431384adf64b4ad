//! Turn PostgreSQL failures into readable [`ScriptError`]s that point at the
//! offending line of the migration script.

use crate::error::ScriptError;
use crate::migration::Script;
use sqlx::postgres::{PgDatabaseError, PgErrorPosition};

const CONTEXT_LINES: usize = 2;

/// The parts of a server error worth showing to an operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ServerError {
    message: String,
    code: Option<String>,
    line: Option<usize>,
    detail: Option<String>,
    hint: Option<String>,
    location: Option<String>,
}

impl ServerError {
    fn from_sqlx(error: &sqlx::Error, sql: &str) -> Self {
        let Some(pg_error) = error
            .as_database_error()
            .and_then(|e| e.try_downcast_ref::<PgDatabaseError>())
        else {
            return Self {
                message: error.to_string(),
                ..Default::default()
            };
        };

        let line = pg_error.position().map(|pos| match pos {
            PgErrorPosition::Original(p) => line_of_position(sql, p),
            PgErrorPosition::Internal { position, .. } => line_of_position(sql, position),
        });

        Self {
            message: pg_error.message().to_string(),
            code: Some(pg_error.code().to_string()),
            line,
            detail: pg_error.detail().map(str::to_string),
            hint: pg_error.hint().map(str::to_string),
            location: pg_error.r#where().map(str::to_string),
        }
    }

    fn render(&self, asset: &str, sql: &str) -> String {
        let mut out = format!("{} failed", asset);
        if let Some(line) = self.line {
            out.push_str(&format!(" at line {}", line));
        }
        out.push_str(": ");
        out.push_str(&self.message);
        if let Some(code) = &self.code {
            out.push_str(&format!(" (SQLSTATE {})", code));
        }

        for (label, value) in [
            ("detail", &self.detail),
            ("hint", &self.hint),
            ("where", &self.location),
        ] {
            if let Some(value) = value {
                out.push_str(&format!("\n  {}: {}", label, value));
            }
        }

        if let Some(line) = self.line {
            out.push('\n');
            out.push_str(&excerpt(sql, line));
        }

        out
    }
}

/// Build the error reported when the server rejects `script`
pub fn script_error(error: &sqlx::Error, script: &Script) -> ScriptError {
    let details = ServerError::from_sqlx(error, &script.sql);
    ScriptError::new(details.render(&script.asset, &script.sql))
}

/// 1-based line number holding the 1-based character `position`
fn line_of_position(sql: &str, position: usize) -> usize {
    sql.chars()
        .take(position.saturating_sub(1))
        .filter(|c| *c == '\n')
        .count()
        + 1
}

/// The lines around `line`, with the failing one marked
fn excerpt(sql: &str, line: usize) -> String {
    let lines: Vec<&str> = sql.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let target = line.clamp(1, lines.len());
    let first = target.saturating_sub(CONTEXT_LINES).max(1);
    let last = (target + CONTEXT_LINES).min(lines.len());

    (first..=last)
        .map(|n| {
            let marker = if n == target { '>' } else { ' ' };
            format!("  {} {:>4} | {}", marker, n, lines[n - 1])
        })
        .collect::<Vec<_>>()
        .join("\n")
}
