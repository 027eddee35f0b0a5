//! examscore CLI: score answer sheets and export the analysis.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "examscore",
    version,
    about = "Exam answer-sheet scoring and item analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an answer sheet and export the results
    Score {
        /// Answer sheet (.csv, .xlsx, .xls, .ods); row 1 is the answer key
        #[arg(long)]
        input: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Question type for a column, e.g. `Q1=pg`, `Q7=esai` (repeatable)
        #[arg(long = "type", value_name = "COL=TYPE")]
        types: Vec<String>,

        /// Type for columns without an explicit assignment
        #[arg(long)]
        default_type: Option<String>,

        /// Treat the first column as respondent names
        #[arg(long)]
        respondent_column: bool,

        /// Operator name shown in reports
        #[arg(long)]
        operator: Option<String>,

        /// Subject name shown in reports
        #[arg(long)]
        subject: Option<String>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output formats: json, html, xlsx, all (comma-separated)
        #[arg(long)]
        format: Option<String>,

        /// Max columns scored concurrently
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// Check an answer sheet for problems without scoring it
    Validate {
        /// Answer sheet to check
        #[arg(long)]
        input: PathBuf,

        /// Treat the first column as respondent names
        #[arg(long)]
        respondent_column: bool,
    },

    /// Create a starter config and example answer sheet
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examscore=info".parse().expect("valid directive"))
                .add_directive("examscore_core=warn".parse().expect("valid directive"))
                .add_directive("examscore_report=warn".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            input,
            config,
            types,
            default_type,
            respondent_column,
            operator,
            subject,
            output,
            format,
            parallelism,
        } => {
            let args = commands::score::ScoreArgs {
                input,
                config,
                types,
                default_type,
                respondent_column,
                operator,
                subject,
                output,
                format,
                parallelism,
            };
            commands::score::execute(args).await
        }
        Commands::Validate {
            input,
            respondent_column,
        } => commands::validate::execute(input, respondent_column),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
