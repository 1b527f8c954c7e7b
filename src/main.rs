mod commands;

use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::{
    AnalyzeSpecArgs, CasesArgs, ConfigCommand, ExportArgs, GenerateArgs, JiraCommand, ProjectCommand,
};

#[derive(Parser)]
#[command(
    name = "storycase",
    version,
    about = "Turn user stories into structured test cases with an LLM, then store, export or sync them."
)]
struct Cli {
    #[arg(short, long, global = true, help = "Debug logging (or set STORYCASE_LOG)")]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Generate test cases from a user story
    Generate(GenerateArgs),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// List saved test cases of a project
    Cases(CasesArgs),
    /// Export saved test cases to CSV, JSON or Excel
    Export(ExportArgs),
    /// Jira / Xray integration
    #[command(subcommand)]
    Jira(JiraCommand),
    /// Turn a specification document into a user story
    AnalyzeSpec(AnalyzeSpecArgs),
    /// Inspect or change configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let cfg = storycase::config::Config::load();

    match cli.command {
        CliCommand::Generate(args) => commands::generate(&cfg, args),
        CliCommand::Project(cmd) => commands::project(&cfg, cmd),
        CliCommand::Cases(args) => commands::cases(&cfg, args),
        CliCommand::Export(args) => commands::export(&cfg, args),
        CliCommand::Jira(cmd) => commands::jira(&cfg, cmd),
        CliCommand::AnalyzeSpec(args) => commands::analyze_spec(&cfg, args),
        CliCommand::Config(cmd) => commands::config(&cfg, cmd),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    storycase::logger::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_count_is_bounded() {
        assert!(Cli::try_parse_from(["storycase", "generate", "--story", "s", "-n", "100"]).is_ok());
        assert!(Cli::try_parse_from(["storycase", "generate", "--story", "s", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["storycase", "generate", "--story", "s", "-n", "10000000000"]).is_err());
    }
}
