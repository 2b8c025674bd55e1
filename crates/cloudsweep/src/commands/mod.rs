use clap::ArgMatches;
use tracing::error;

mod clean;
mod json_types;
mod services;

/// How the process should exit once a command has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Some deletions failed or the run was interrupted.
    PartialFailure,
}

impl CommandStatus {
    /// Exit code to use instead of the normal `Ok` exit, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandStatus::Success => None,
            CommandStatus::PartialFailure => Some(2),
        }
    }
}

pub fn run_command(matches: &ArgMatches) -> Result<CommandStatus, Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("clean", sub_matches)) => clean::handle_clean_command(sub_matches),
        Some(("services", sub_matches)) => {
            services::handle_services_command(sub_matches)?;
            Ok(CommandStatus::Success)
        }
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}
