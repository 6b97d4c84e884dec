use clap::{Parser, Subcommand};
use colored::Colorize;
use estimate_forge::cli;
use estimate_forge::error::EstimateResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estimate-forge")]
#[command(about = "Fill Excel estimation templates from JSON estimation payloads.")]
#[command(long_about = "Estimate Forge - Excel estimation template population

Appends the rows of a JSON estimation payload to the 'Estimation' sheet of an
existing workbook. Columns are found by their header titles, existing data is
never overwritten and formulas in the last pre-filled row are carried down.

COMMANDS:
  fill      - Append payload rows to a template
  inspect   - Show how a template would be filled
  template  - Write a blank template with the standard headers
  export    - Payload to a Features/Summary workbook
  summary   - Totals and single-resource duration

EXAMPLES:
  estimate-forge fill --json rows.json --inbook Estimate.xlsx
  estimate-forge fill --json rows.json --inbook Estimate.xlsx --outbook out.xlsx
  estimate-forge inspect Estimate.xlsx --json
  estimate-forge summary --json rows.json

LOGGING:
  RUST_LOG=estimate_forge=debug estimate-forge fill ...")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Append payload rows to the 'Estimation' sheet of a template.

The payload must be a JSON object with a 'rows' array. Each row is written to
the first empty row below the template's data, into the columns whose header
titles match. Formulas in the last pre-filled row are copied into every new row.

The template is never modified. Without --outbook the result is written next to
it as <name>.FILLED-<YYYYmmdd-HHMMSS>.xlsx.

EXAMPLE:
  estimate-forge fill --json rows.json --inbook Estimate.xlsx")]
    /// Append payload rows to a template
    Fill {
        /// Path to the JSON payload (must contain a 'rows' array)
        #[arg(long)]
        json: PathBuf,

        /// Path to the template workbook (.xlsx)
        #[arg(long)]
        inbook: PathBuf,

        /// Output workbook path (defaults to a timestamped copy of the template)
        #[arg(long)]
        outbook: Option<PathBuf>,

        /// Show the detected data region and debug logs
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how a template would be filled, without modifying it
    Inspect {
        /// Path to the template workbook (.xlsx)
        template: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a blank template with the standard headers
    Template {
        /// Output workbook path (.xlsx)
        output: PathBuf,
    },

    /// Export a payload to a Features/Summary workbook
    Export {
        /// Path to the JSON payload
        #[arg(long)]
        json: PathBuf,

        /// Output workbook path (.xlsx)
        output: PathBuf,

        /// Show verbose export steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print totals and single-resource duration for a payload
    Summary {
        /// Path to the JSON payload
        #[arg(long)]
        json: PathBuf,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        matches!(
            self,
            Commands::Fill { verbose: true, .. } | Commands::Export { verbose: true, .. }
        )
    }
}

/// Logs go to stderr so stdout stays parseable (`inspect --json`)
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("estimate_forge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> EstimateResult<()> {
    match command {
        Commands::Fill {
            json,
            inbook,
            outbook,
            verbose,
        } => cli::fill(json, inbook, outbook, verbose),

        Commands::Inspect { template, json } => cli::inspect(template, json),

        Commands::Template { output } => cli::template(output),

        Commands::Export {
            json,
            output,
            verbose,
        } => cli::export(json, output, verbose),

        Commands::Summary { json } => cli::summary(json),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.command.verbose());

    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
