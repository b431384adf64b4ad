use crate::engine::MigrationResult;
use crate::error::{ScriptError, display_version};
use crate::migration::{Direction, MigrationStep};
use console::style;
use std::time::Duration;

/// Prints human progress lines for a migration run.
///
/// Silent reporters print nothing; the engine logs through `tracing` either way.
#[derive(Debug, Clone, Default)]
pub struct MigrationReporter {
    enabled: bool,
    verbose: bool,
}

impl MigrationReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            enabled: true,
            verbose,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn phase(&self, title: &str) {
        if self.enabled {
            println!("{}", style(title).bold());
        }
    }

    pub fn waiting_for_lock(&self, database: &str) {
        if self.enabled {
            println!(
                "  {} Waiting for the migration lock on {}",
                style("…").yellow(),
                database
            );
        }
    }

    pub fn step_started(&self, step: &MigrationStep, direction: Direction) {
        if self.enabled && self.verbose {
            println!(
                "  {} {} {}",
                arrow(direction),
                step.version,
                style(&step.description).dim()
            );
        }
    }

    pub fn step_completed(&self, step: &MigrationStep, direction: Direction, duration: Duration) {
        if self.enabled {
            println!(
                "  {} {} {} {} ({})",
                style("✓").green(),
                arrow(direction),
                step.version,
                step.description,
                style(format_duration(duration)).dim()
            );
        }
    }

    pub fn step_failed(&self, step: &MigrationStep, direction: Direction, error: &ScriptError) {
        if self.enabled {
            println!(
                "  {} {} {} {}",
                style("✗").red(),
                arrow(direction),
                step.version,
                step.description
            );
            if self.verbose {
                println!("{}", style(&error.message).red());
            }
        }
    }

    pub fn finished(&self, result: &MigrationResult, duration: Duration) {
        if !self.enabled {
            return;
        }

        if result.changed {
            println!(
                "{} {} migration{} in {}, now at version {}",
                style("✓").green(),
                result.applied_versions.len(),
                if result.applied_versions.len() == 1 { "" } else { "s" },
                style(format_duration(duration)).green(),
                display_version(result.final_version)
            );
        } else {
            println!(
                "{} Already at version {}",
                style("✓").green(),
                display_version(result.final_version)
            );
        }
    }
}

fn arrow(direction: Direction) -> console::StyledObject<&'static str> {
    match direction {
        Direction::Up => style("↑").cyan(),
        Direction::Down => style("↓").magenta(),
    }
}

/// Compact human duration: `850ms`, `2.3s`, `4m10s`, `1h5m`
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();

    match secs {
        0 => format!("{}ms", d.subsec_millis()),
        1..=59 => match d.subsec_millis() / 100 {
            0 => format!("{}s", secs),
            tenths => format!("{}.{}s", secs, tenths),
        },
        60..=3599 => match (secs / 60, secs % 60) {
            (m, 0) => format!("{}m", m),
            (m, s) => format!("{}m{}s", m, s),
        },
        _ => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{}h", h),
            (h, m) => format!("{}h{}m", h, m),
        },
    }
}
