//! CLI command handlers.

mod check;
mod logout;
mod toggle;

pub use check::run_check_command;
pub use logout::run_logout_command;
pub use toggle::run_toggle_command;
