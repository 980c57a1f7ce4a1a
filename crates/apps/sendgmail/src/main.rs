//! sendgmail - send an email through the Gmail API
//!
//! Parses flags, sets up logging and runs the mail pipeline. Exits with 0 on
//! success and 1 on any failure.

mod cli;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use cli::Cli;
use log::debug;
use mail::{GmailClient, GoogleAuthorizer, Outcome, Pipeline, RunError, SearchRoots};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through the error path too
            let failed = e.use_stderr();
            e.print().ok();
            return if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    match run(&cli) {
        Ok(Outcome::Sent { id }) => println!("Message Id: {}", id),
        Ok(Outcome::Drafted { id }) => println!("Draft Id: {}", id),
        Ok(Outcome::SetupComplete { config_path }) => {
            println!("Wrote configuration to {}", config_path.display())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.shows_usage() {
                eprintln!("\n{}", Cli::command().render_help());
            }
            return ExitCode::from(e.exit_code());
        }
    }
    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> Result<Outcome, RunError> {
    let roots = SearchRoots::from_env().map_err(RunError::Io)?;
    debug!("Search roots: {:?}", roots);

    let authorizer = GoogleAuthorizer;
    let client = GmailClient::new();
    let pipeline = Pipeline::new(roots, &authorizer, &client);

    let invocation = cli.invocation();
    let mut stdin = std::io::stdin().lock();
    pipeline.run(&invocation, &mut stdin)
}
