use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Upper bound for either leaderboard flag.
pub const LEADERBOARD_LIMIT_CAP: u64 = 1000;

/// Classroom portal sidecar: JSON requests on stdin, JSON responses on stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "classroomd")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Workspace to open at start-up (otherwise wait for `workspace.select`)
    #[arg(long, env = "CLASSROOMD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter, e.g. `info` or `classroomd=debug`
    #[arg(long, env = "CLASSROOMD_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines (always on stderr)
    #[arg(long, env = "CLASSROOMD_LOG_JSON")]
    pub log_json: bool,

    /// Leaderboard size when the request does not ask for one
    #[arg(
        long,
        env = "CLASSROOMD_LEADERBOARD_LIMIT",
        default_value = "10",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=LEADERBOARD_LIMIT_CAP)
    )]
    pub leaderboard_limit: usize,

    /// Largest leaderboard a request may ask for
    #[arg(
        long,
        env = "CLASSROOMD_MAX_LEADERBOARD_LIMIT",
        default_value = "100",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=LEADERBOARD_LIMIT_CAP)
    )]
    pub max_leaderboard_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_level: "info".to_string(),
            log_json: false,
            leaderboard_limit: 10,
            max_leaderboard_limit: 100,
        }
    }
}
