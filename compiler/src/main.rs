//! Shrink-wrap CLI
//!
//! Main entry point for the `shrinkwrap` command.

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use shrinkwrap::hlir::HlirModule;
use shrinkwrap::libfunc::LibraryOracle;
use shrinkwrap::optimizer::shrinkwrap::catalog;
use shrinkwrap::{ShrinkWrapConfig, ShrinkWrapPass, ShrinkWrapStats};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "shrinkwrap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Conditionally execute dead, errno-setting math library calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pass over an HLIR module stored as JSON
    Run {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Configuration file (.toml or .json)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,

        /// Do not wrap calls that raise domain errors
        #[arg(long)]
        no_domain_error: bool,

        /// Do not wrap calls that raise range errors
        #[arg(long)]
        no_range_error: bool,

        /// Do not wrap calls that raise pole errors
        #[arg(long)]
        no_pole_error: bool,

        /// Output representation
        #[arg(long, value_enum, default_value = "json")]
        emit: EmitType,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// List the routines the pass knows and their error conditions
    Catalog {
        /// Target triple used to report availability
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitType {
    /// HLIR as JSON
    Json,
    /// Human-readable HLIR
    Hlir,
}

struct RunOptions {
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    target: Option<String>,
    no_domain_error: bool,
    no_range_error: bool,
    no_pole_error: bool,
    emit: EmitType,
    stats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("shrinkwrap=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            input,
            output,
            config,
            target,
            no_domain_error,
            no_range_error,
            no_pole_error,
            emit,
            stats,
        } => run(RunOptions {
            input,
            output,
            config,
            target,
            no_domain_error,
            no_range_error,
            no_pole_error,
            emit,
            stats,
        }),
        Commands::Catalog { target } => print_catalog(target),
    }
}

fn load_config(explicit: Option<&Path>, input: &Path) -> Result<ShrinkWrapConfig> {
    match explicit {
        Some(path) => Ok(ShrinkWrapConfig::from_file(path)?),
        None => Ok(ShrinkWrapConfig::find_config(input)?.unwrap_or_default()),
    }
}

fn run(opts: RunOptions) -> Result<()> {
    let mut config = load_config(opts.config.as_deref(), &opts.input)?;
    if opts.target.is_some() {
        config.target.triple = opts.target;
    }
    config.domain_error &= !opts.no_domain_error;
    config.range_error &= !opts.no_range_error;
    config.pole_error &= !opts.no_pole_error;

    let source = std::fs::read_to_string(&opts.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read input file {}", opts.input.display()))?;
    let mut module: HlirModule = serde_json::from_str(&source)
        .into_diagnostic()
        .wrap_err("Failed to parse HLIR module")?;
    module.sync_id_counters();

    let tli = config.target_library_info()?;
    let pass = ShrinkWrapPass::new(&tli, config);
    let mut stats = ShrinkWrapStats::new();
    let preserved = pass.run_on_module(&mut module, &mut stats)?;
    info!("preserved analyses: {:?}", preserved);

    let rendered = match opts.emit {
        EmitType::Json => serde_json::to_string_pretty(&module)
            .into_diagnostic()
            .wrap_err("Failed to serialize HLIR module")?,
        EmitType::Hlir => module.to_string(),
    };

    match &opts.output {
        Some(path) => std::fs::write(path, rendered)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", rendered),
    }

    if opts.stats {
        eprintln!("{}", stats);
    }

    Ok(())
}

fn print_catalog(target: Option<String>) -> Result<()> {
    let mut config = ShrinkWrapConfig::default();
    config.target.triple = target;
    let tli = config.target_library_info()?;

    for entry in catalog::entries() {
        let availability = if tli.is_available(entry.func) {
            ""
        } else {
            " (unavailable)"
        };
        println!("{:<10} {}{}", entry.func.name(), entry.profile, availability);
    }

    Ok(())
}
