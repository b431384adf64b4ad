pub mod db;

pub use db::{
    CommandContext, OutputFormat, cmd_db_down, cmd_db_force, cmd_db_goto, cmd_db_list,
    cmd_db_migrate, cmd_db_status, cmd_db_up,
};
