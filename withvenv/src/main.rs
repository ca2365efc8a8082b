mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use withvenv_core::observability;
use withvenv_env::EnvError;

fn main() -> ExitCode {
    observability::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run(args)) => commands::run(&args),
        Some(Commands::Create { env_dir, env, json }) => commands::create(&env_dir, &env, json),
        None => commands::run(&RunArgs::default()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    }
}

/// Mirror a failed child's exit code; anything else is 1.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let code = err.chain().find_map(|cause| match cause.downcast_ref::<EnvError>() {
        Some(EnvError::ProcessFailed { code: Some(c), .. }) => u8::try_from(*c).ok(),
        _ => None,
    });
    match code {
        Some(c) if c != 0 => ExitCode::from(c),
        _ => ExitCode::FAILURE,
    }
}
