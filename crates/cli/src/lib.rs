pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "bookline",
    about = "Bookline operator CLI",
    long_about = "Operate Bookline: migrations, demo fixtures, readiness checks, and slot inspection.",
    after_help = "Examples:\n  bookline migrate\n  bookline seed\n  bookline doctor --json\n  bookline slots demo-salon --days 7"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Seed the deterministic demo business")]
    Seed,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the current available slots for a business")]
    Slots {
        #[arg(help = "Business slug, e.g. demo-salon")]
        slug: String,
        #[arg(long, default_value_t = 7, help = "Days of lookahead")]
        days: u32,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run().await,
        Command::Seed => commands::seed::run().await,
        Command::Doctor { json } => commands::doctor::run(json).await,
        Command::Slots { slug, days } => commands::slots::run(&slug, days).await,
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
