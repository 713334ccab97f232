mod commands;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use logging::{init_logging, LogConfig, LogFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "wcr",
    version,
    about = "Extract well-completion records from reports and reconcile them with the canonical store"
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = wcr_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    quiet: u8,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from one region of a document page
    Extract {
        /// Document file name in the upload directory
        document: String,

        /// Table label or name (e.g. CASING, wcr_casing)
        #[arg(short, long)]
        table: String,

        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Page-relative region as x,y,w,h fractions (whole page when omitted)
        #[arg(long, value_parser = commands::parse_quad, conflicts_with = "selection")]
        region: Option<[f64; 4]>,

        /// Rectangle drawn on a preview, as x,y,w,h in preview pixels
        #[arg(long, value_parser = commands::parse_quad, requires = "viewport")]
        selection: Option<[f64; 4]>,

        /// Size of the preview the selection was drawn on, as width,height
        #[arg(long, value_parser = commands::parse_pair, requires = "selection")]
        viewport: Option<[f64; 2]>,

        /// Try the assisted extraction service first
        #[arg(long)]
        assisted: bool,

        /// Also write the extraction result as JSON to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Check which extracted rows already exist in the canonical store
    Check {
        /// Rows JSON written by `wcr extract --out`
        rows: PathBuf,

        /// Table label or name
        #[arg(short, long)]
        table: String,
    },
    /// List unpopulated columns per extracted row
    Missing {
        /// Rows JSON written by `wcr extract --out`
        rows: PathBuf,

        /// Table label or name
        #[arg(short, long)]
        table: String,
    },
    /// Detect and extract every record block in a document and look each up
    Scan {
        /// Document file name in the upload directory
        document: String,

        /// Table label or name
        #[arg(short, long)]
        table: String,

        /// Pages processed at once (overrides the config file)
        #[arg(long)]
        workers: Option<usize>,

        /// Try the assisted extraction service first on every block
        #[arg(long)]
        assisted: bool,
    },
    /// List the target tables, their columns and labels
    Tables,
}

fn main() {
    let cli = Cli::parse();

    init_logging(&LogConfig::from_flags(cli.verbose, cli.quiet).with_format(cli.log_format));

    let result = match cli.command {
        Commands::Extract {
            document,
            table,
            page,
            region,
            selection,
            viewport,
            assisted,
            out,
        } => commands::extract::run(
            &cli.config,
            commands::extract::Request {
                document,
                table,
                page,
                region,
                selection,
                viewport,
                assisted,
            },
            cli.output,
            out,
        ),
        Commands::Check { rows, table } => {
            commands::check::run(&cli.config, &rows, &table, cli.output)
        }
        Commands::Missing { rows, table } => {
            commands::missing::run(&cli.config, &rows, &table, cli.output)
        }
        Commands::Scan {
            document,
            table,
            workers,
            assisted,
        } => commands::scan::run(
            &cli.config,
            &document,
            &table,
            workers,
            assisted,
            cli.output,
        ),
        Commands::Tables => commands::tables::run(cli.output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
