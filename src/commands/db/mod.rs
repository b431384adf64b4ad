pub mod common;
pub mod force;
pub mod list;
pub mod migrate;
pub mod status;

pub use common::{CommandContext, OutputFormat};
pub use force::cmd_db_force;
pub use list::cmd_db_list;
pub use migrate::{cmd_db_down, cmd_db_goto, cmd_db_migrate, cmd_db_up};
pub use status::cmd_db_status;
