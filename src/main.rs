use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use slotcheck::diagnostics::{self, OutputFormat};
use slotcheck::{CheckOptions, manifest, registry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slotcheck", version, about = "Static checker for typed UI event handlers")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

#[derive(Subcommand)]
enum Commands {
    /// Check handler signatures in the given source and stub files
    Check {
        /// Source files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Signal registry (TOML); defaults to the bundled Qt registry
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Output format: pretty (default), short, json
        #[arg(long, default_value = "pretty", value_parser = parse_format)]
        format: OutputFormat,
        /// Maximum number of analysis passes
        #[arg(long)]
        max_passes: Option<usize>,
        /// Config file; discovered from the first input when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective signal registry as TOML
    Registry {
        /// Signal registry (TOML); defaults to the bundled Qt registry
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Only print this emitter type
        #[arg(long = "type")]
        type_name: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Check { files, registry, format, max_passes, config } => {
            run_check(files, registry, format, max_passes, config)
        }
        Commands::Registry { registry, type_name } => run_registry(registry, type_name),
    };
    std::process::exit(code);
}

fn run_check(
    files: Vec<PathBuf>,
    registry: Option<PathBuf>,
    format: OutputFormat,
    max_passes: Option<usize>,
    config: Option<PathBuf>,
) -> i32 {
    let mut options = CheckOptions::default();
    let loaded = match &config {
        Some(path) => manifest::load(path).map(Some),
        None => manifest::discover(&files[0]),
    };
    match loaded {
        Ok(Some(found)) => {
            tracing::debug!(path = %found.path.display(), "using config");
            found.apply(&mut options);
        }
        Ok(None) => {}
        Err(err) => {
            eprintln!("{}", diagnostics::render_error(&err, &[]));
            return 2;
        }
    }
    if let Some(registry) = registry {
        options.registry_path = Some(registry);
    }
    if let Some(max) = max_passes {
        options.max_passes = max.max(1);
    }

    let loaded = registry::load_or_bundled(options.registry_path.as_ref())
        .and_then(|registry| Ok((registry, slotcheck::collect_sources(&files, &options.stubs)?)));
    let (registry, sources) = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{}", diagnostics::render_error(&err, &[]));
            return 2;
        }
    };
    let report = match slotcheck::check_sources(&sources, &options, &registry) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{}", diagnostics::render_error(&err, &sources));
            return 2;
        }
    };

    let color = format == OutputFormat::Pretty && std::io::stdout().is_terminal();
    print!("{}", report.render(format, color));
    if format == OutputFormat::Json {
        println!();
    }
    if report.is_clean() {
        eprintln!("no issues found in {} file(s)", report.files.len());
        0
    } else {
        eprintln!("found {} issue(s) in {} file(s)", report.diagnostics.len(), report.files.len());
        1
    }
}

fn run_registry(path: Option<PathBuf>, type_name: Option<String>) -> i32 {
    let path = match path {
        Some(path) => Ok(Some(path)),
        None => manifest::discover(std::path::Path::new(".")).map(|m| m.and_then(|m| m.registry)),
    };
    let rendered = path
        .and_then(|path| registry::load_or_bundled(path.as_ref()))
        .and_then(|r| r.to_toml(type_name.as_deref()));
    match rendered {
        Ok(text) => {
            print!("{text}");
            0
        }
        Err(err) => {
            eprintln!("{}", diagnostics::render_error(&err, &[]));
            2
        }
    }
}
