use clap::{Parser, Subcommand, ValueEnum};

/// Watch Banner course registration for open lecture seats and text when they appear.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format(), global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check the configured courses every interval and send SMS alerts (default)
    Run,
    /// Check the given courses once and print seat counts; no alerts are sent
    Check {
        /// Course codes such as CSCI2020U; defaults to COURSE_CODES
        codes: Vec<String>,
    },
    /// Send a single test SMS with the configured Twilio settings
    TestSms,
    /// Open the registration page, log in, and list the visible form inputs
    Inspect,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable single-line output
    Pretty,
    /// One JSON object per event
    Json,
}

/// Pretty in debug builds, JSON in release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

impl Args {
    pub fn selected_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
