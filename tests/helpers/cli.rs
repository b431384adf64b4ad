use assert_cmd::Command;
use tempfile::TempDir;

/// A `vpc` invocation isolated from the developer's environment.
///
/// Runs inside an empty temp directory (no `vpc.yaml`, no `.env`) with the
/// password variables cleared.
pub struct VpcCommand {
    pub temp_dir: TempDir,
}

impl VpcCommand {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("vpc").unwrap();
        cmd.current_dir(self.temp_dir.path())
            .env_remove("VPC_DB_PASSWORD")
            .env_remove("PGPASSWORD")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Write `vpc.yaml` into the working directory
    pub fn write_config(&self, yaml: &str) {
        std::fs::write(self.temp_dir.path().join("vpc.yaml"), yaml)
            .expect("Failed to write config file");
    }
}
