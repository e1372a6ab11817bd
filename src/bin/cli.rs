use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use ortbridge::config::Config;
use ortbridge::enrich::VcsDownloader;
use ortbridge::error::BridgeError;
use ortbridge::output::OutputFormat;
use ortbridge::ResolveReport;

const DEFAULT_CONFIG_FILE: &str = ".ortbridge.toml";

#[derive(Parser)]
#[command(
    name = "ortbridge",
    about = "Turn ORT analyzer results into compliance artifacts",
    version,
    author
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ORT analyzer on a project and resolve its result
    Analyze {
        /// Project directory to analyze
        #[arg(default_value = ".")]
        project: PathBuf,

        /// Directory for the ORT analyzer result
        #[arg(long, default_value = "ort-analyzer-result")]
        ort_output: PathBuf,

        /// Also download and archive the sources of every package
        #[arg(long)]
        download: bool,

        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        downloader: DownloaderArgs,
    },

    /// Resolve an existing ORT result file into artifacts
    Resolve {
        /// ORT result file (YAML or JSON)
        result: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Resolve an ORT result file and download the sources of its packages
    Download {
        /// ORT result file (YAML or JSON)
        result: PathBuf,

        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        downloader: DownloaderArgs,
    },

    /// Generate a starter .ortbridge.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Config file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Output format (console, json)
    #[arg(long, short = 'f', default_value = "console")]
    format: String,

    /// Write output to file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Keep license findings from excluded paths
    #[arg(long)]
    keep_excluded: bool,
}

#[derive(Args)]
struct DownloaderArgs {
    /// Directory receiving the source archives
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Number of parallel downloads
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Per-package download timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            project,
            ort_output,
            download,
            common,
            downloader,
        } => cmd_analyze(project, ort_output, download, common, downloader),
        Commands::Resolve { result, common } => cmd_resolve(result, common),
        Commands::Download {
            result,
            common,
            downloader,
        } => cmd_download(result, common, downloader),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(common: &CommonArgs) -> Result<Config, BridgeError> {
    let path = common
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::load(&path)?;
    if common.keep_excluded {
        config.analyzer.keep_excluded_artifacts = true;
    }
    Ok(config)
}

fn apply_downloader_args(config: &mut Config, args: DownloaderArgs) -> Result<(), BridgeError> {
    if let Some(dir) = args.output_dir {
        config.downloader.output_dir = dir;
    }
    if let Some(jobs) = args.jobs {
        config.downloader.jobs = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.downloader.timeout_secs = timeout;
    }
    config.downloader.validate()
}

fn parse_format(format_str: &str) -> OutputFormat {
    OutputFormat::from_str_lenient(format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    })
}

fn emit(report: &ResolveReport, common: &CommonArgs) -> Result<i32, BridgeError> {
    let format = parse_format(&common.format);
    let rendered = ortbridge::render_report(report, format)?;
    write_output(common.output.as_deref(), &rendered)?;
    Ok(0)
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<(), BridgeError> {
    match path {
        Some(out) => std::fs::write(out, rendered)?,
        None => print!("{}", rendered),
    }
    Ok(())
}

fn enrich(report: &mut ResolveReport, config: &Config) -> Result<(), BridgeError> {
    let downloader = VcsDownloader::from_options(&config.downloader);
    ortbridge::enrich(report, Arc::new(downloader), config)
}

fn cmd_analyze(
    project: PathBuf,
    ort_output: PathBuf,
    download: bool,
    common: CommonArgs,
    downloader: DownloaderArgs,
) -> Result<i32, BridgeError> {
    let mut config = load_config(&common)?;
    apply_downloader_args(&mut config, downloader)?;

    let mut report = ortbridge::analyze_project(&project, &ort_output, &config)?;
    if download {
        enrich(&mut report, &config)?;
    }
    emit(&report, &common)
}

fn cmd_resolve(result: PathBuf, common: CommonArgs) -> Result<i32, BridgeError> {
    let config = load_config(&common)?;
    let report = ortbridge::resolve_file(&result, &config)?;
    emit(&report, &common)
}

fn cmd_download(
    result: PathBuf,
    common: CommonArgs,
    downloader: DownloaderArgs,
) -> Result<i32, BridgeError> {
    let mut config = load_config(&common)?;
    apply_downloader_args(&mut config, downloader)?;

    let mut report = ortbridge::resolve_file(&result, &config)?;
    enrich(&mut report, &config)?;
    emit(&report, &common)
}

fn cmd_init(force: bool) -> Result<i32, BridgeError> {
    let path = PathBuf::from(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{DEFAULT_CONFIG_FILE} already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {DEFAULT_CONFIG_FILE}");

    Ok(0)
}
