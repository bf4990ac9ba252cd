//! zwrap - stream data through the legacy or block-codec compressor
//!
//! Compresses with either backend and decompresses whichever one produced
//! the input, deciding from the first four bytes.

mod display;
mod json_output;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use zwrap_compression::{DeflateOptions, DeflateStream, InflateOptions, InflateStream};
use zwrap_config::{Config, ConfigLoader, LoggingConfig};
use zwrap_types::{Backend, WindowBits, HEADER_SIZE};

use crate::json_output::{RunSummaryJson, SniffJson};

/// zwrap - dual-backend streaming compressor
#[derive(Parser)]
#[command(
    name = "zwrap",
    version = env!("CARGO_PKG_VERSION"),
    about = "Stream data through the legacy or block-codec compressor",
    long_about = "zwrap compresses with the deflate-family engine or with Zstandard frames\n\
                  and decompresses either, choosing the engine from the stream's first\n\
                  four bytes."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file or stdin
    Compress {
        /// Input file (stdin when omitted)
        input: Option<PathBuf>,
        /// Output file (stdout when omitted)
        output: Option<PathBuf>,
        /// Backend to compress with
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,
        /// Compression level (-1 for the engine default)
        #[arg(short, long, allow_negative_numbers = true)]
        level: Option<i32>,
        /// Preset dictionary file
        #[arg(long)]
        dict: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decompress a file or stdin; the backend is detected
    Decompress {
        /// Input file (stdin when omitted)
        input: Option<PathBuf>,
        /// Output file (stdout when omitted)
        output: Option<PathBuf>,
        /// Preset dictionary file
        #[arg(long)]
        dict: Option<PathBuf>,
        /// Legacy window bits, used only for legacy streams
        #[arg(long, allow_negative_numbers = true)]
        window_bits: Option<i8>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report which backend a compressed file belongs to
    Sniff {
        /// File to inspect
        path: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum BackendArg {
    Legacy,
    Block,
}

impl From<BackendArg> for Backend {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Legacy => Backend::Legacy,
            BackendArg::Block => Backend::BlockCodec,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load_default(),
    }
    .context("Failed to load configuration")?;

    init_logging(&config.logging, cli.debug, cli.quiet, cli.verbose)?;
    debug!("zwrap v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Compress {
            input,
            output,
            backend,
            level,
            dict,
            json,
        } => {
            let mut config = config;
            if let Some(backend) = backend {
                config.engine.backend = backend.into();
            }
            if let Some(level) = level {
                config.engine.level = level;
            }
            if dict.is_some() {
                config.stream.dictionary = dict;
            }
            compress_command(&config, input.as_deref(), output.as_deref(), json, cli.quiet)
        }
        Commands::Decompress {
            input,
            output,
            dict,
            window_bits,
            json,
        } => {
            let mut config = config;
            if let Some(bits) = window_bits {
                config.engine.window_bits = bits;
            }
            if dict.is_some() {
                config.stream.dictionary = dict;
            }
            decompress_command(&config, input.as_deref(), output.as_deref(), json, cli.quiet)
        }
        Commands::Sniff { path, json } => sniff_command(&path, json),
        Commands::Config { default } => config_command(&config, default),
    }
}

fn init_logging(logging: &LoggingConfig, debug: bool, quiet: bool, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn read_dictionary(config: &Config) -> Result<Option<Vec<u8>>> {
    config
        .stream
        .dictionary
        .as_ref()
        .map(|path| {
            std::fs::read(path)
                .with_context(|| format!("Failed to read dictionary {}", path.display()))
        })
        .transpose()
}

fn report(summary: &RunSummaryJson, json: bool, quiet: bool) -> Result<()> {
    if json {
        eprintln!("{}", summary.to_json()?);
    } else if !quiet {
        display::display_summary(summary);
    }
    Ok(())
}

fn compress_command(
    config: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let params = config.engine.stream_params()?;
    let backend = config.engine.backend;
    info!(%backend, level = params.level.get(), "compressing");

    let mut stream = DeflateStream::with_options(
        DeflateOptions::default()
            .with_backend(backend)
            .with_params(params),
    )?;
    if let Some(dictionary) = read_dictionary(config)? {
        stream.set_dictionary(&dictionary)?;
    }

    let started = Instant::now();
    let mut reader = open_input(input)?;
    let mut writer = open_output(output)?;
    let totals = pipeline::compress(
        &mut stream,
        &mut reader,
        &mut writer,
        config.stream.buffer_size.get(),
    );
    stream.end();
    let totals = totals?;

    let summary = RunSummaryJson::new(
        "compress",
        Some(backend),
        totals,
        started.elapsed().as_secs_f64(),
    );
    report(&summary, json, quiet)
}

fn decompress_command(
    config: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let window_bits = WindowBits::new(config.engine.window_bits)?;
    let mut stream =
        InflateStream::with_options(InflateOptions::default().with_window_bits(window_bits))?;
    if let Some(dictionary) = read_dictionary(config)? {
        stream.set_dictionary(&dictionary)?;
    }

    let started = Instant::now();
    let mut reader = open_input(input)?;
    let mut writer = open_output(output)?;
    let totals = pipeline::decompress(
        &mut stream,
        &mut reader,
        &mut writer,
        config.stream.buffer_size.get(),
    );
    let backend = stream.resolved();
    stream.end();
    let totals = totals?;

    let summary = RunSummaryJson::new(
        "decompress",
        backend,
        totals,
        started.elapsed().as_secs_f64(),
    );
    report(&summary, json, quiet)
}

fn sniff_command(path: &Path, json: bool) -> Result<()> {
    let mut header = Vec::with_capacity(HEADER_SIZE);
    File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut header)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let backend = zwrap_compression::sniff(&header);
    if json {
        let result = SniffJson {
            path: path.display().to_string(),
            backend,
            header: header.iter().map(|byte| format!("{:02x}", byte)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}: {}", path.display(), backend);
    }
    Ok(())
}

fn config_command(config: &Config, default: bool) -> Result<()> {
    let shown = if default {
        display::display_info("Default configuration");
        Config::default()
    } else {
        display::display_info("Effective configuration");
        config.clone()
    };
    print!("{}", ConfigLoader::render(&shown, Path::new("zwrap.toml"))?);
    Ok(())
}
