pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "rentdesk",
    about = "RentDesk operator CLI",
    long_about = "Inspect configuration, prepare the records store, print the business report, and ask the assistant from a terminal.",
    after_help = "Examples:\n  rentdesk config\n  rentdesk seed\n  rentdesk ask \"how many bookings are active?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo bookings, reviews, customer notes, and today's visitors")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the business report the assistant answers business questions from")]
    Report,
    #[command(about = "Send one message through the assistant and print the reply")]
    Ask {
        #[arg(help = "Message to send")]
        message: String,
        #[arg(
            long = "type",
            help = "Force a lookup source (news, sports, wikipedia, duckduckgo) or `gemini` for a direct answer"
        )]
        kind: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Report => commands::report::run(),
        Command::Ask { message, kind } => commands::ask::run(&message, kind.as_deref()),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
