//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jobcan_core::config::{DEFAULT_ADIT_GROUP_ID, DEFAULT_SESSION_FILE};

/// Clock in and out of the Jobcan attendance portal.
///
/// The login session is kept in a cookie file so repeated runs reuse it
/// instead of signing in every time.
#[derive(Parser)]
#[command(name = "jobcan")]
#[command(author, version, about)]
#[command(arg_required_else_help(true))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Portal username (email)
    #[arg(short, long, env = "JOBCAN_USERNAME", global = true)]
    pub username: Option<String>,

    /// Portal password
    #[arg(short, long, env = "JOBCAN_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Session cookie file
    #[arg(short, long = "cookie", default_value = DEFAULT_SESSION_FILE, global = true)]
    pub cookie: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Deadline for the whole operation in seconds (1-120)
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=120), global = true)]
    pub timeout: u64,

    /// Attendance group id sent with clock actions
    #[arg(long, default_value = DEFAULT_ADIT_GROUP_ID, global = true)]
    pub group_id: String,

    /// Identity host base URL
    #[arg(long, hide = true, global = true)]
    pub id_base_url: Option<String>,

    /// Attendance host base URL
    #[arg(long, hide = true, global = true)]
    pub attendance_base_url: Option<String>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("command", &self.command)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("cookie", &self.cookie)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("timeout", &self.timeout)
            .field("group_id", &self.group_id)
            .field("id_base_url", &self.id_base_url)
            .field("attendance_base_url", &self.attendance_base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the current work status
    Check,
    /// Clock in if clocked out, clock out if clocked in
    Toggle,
    /// Discard the stored session
    Logout,
}
