use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, error, info};

use orbital_density::config::{build_config, FileConfig, OutputFormat, Overrides, RunConfig};
use orbital_density::export::{save_heatmap, write_json, write_text};
use orbital_density::logging::setup_logging;
use orbital_density::sampling::{points_above, sample_points};
use orbital_density::{DensityEngine, DensityError, DensityField, HydrogenEngine, Result};

/// Probability density of a hydrogen-like orbital over a polar grid.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Orbital preset (1s, 2s, 2p, 3s, 3p, 3d, 4f); sets n and l
    #[arg(long, value_name = "LABEL")]
    orbital: Option<String>,

    /// Principal quantum number
    #[arg(short = 'n', long)]
    n: Option<u32>,

    /// Angular momentum quantum number
    #[arg(short = 'l', long)]
    l: Option<u32>,

    /// Magnetic quantum number
    #[arg(short = 'm', long, allow_negative_numbers = true)]
    m: Option<i32>,

    /// Samples per axis
    #[arg(long, value_name = "NUM")]
    grid_size: Option<usize>,

    /// Outer radius of the grid in Bohr radii
    #[arg(long, value_name = "FLOAT")]
    max_radius: Option<f64>,

    /// Compute radius rows in parallel
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel (defaults to logical cores)
    #[arg(short = 'j', long, value_name = "NUM")]
    threads: Option<usize>,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Points format: keep every cell above this density instead of sampling
    #[arg(long, value_name = "FLOAT")]
    threshold: Option<f64>,

    /// Points format: number of rejection-sampled points
    #[arg(long, value_name = "NUM")]
    samples: Option<usize>,

    /// Points format: RNG seed
    #[arg(long, value_name = "NUM")]
    seed: Option<u64>,

    /// Increase verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            orbital: self.orbital.clone(),
            n: self.n,
            l: self.l,
            m: self.m,
            grid_size: self.grid_size,
            max_radius: self.max_radius,
            parallel: self.parallel.then_some(true),
            format: self.format,
            output: self.output.clone(),
            threshold: self.threshold,
            samples: self.samples,
            seed: self.seed,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    debug!("arguments: {cli:?}");

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| DensityError::Config(format!("thread pool: {e}")))?;
    }

    let file = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let config = build_config(file, &cli.overrides())?;

    info!(
        "{} orbital (n={}, l={}, m={}), {}x{} grid out to r={}",
        config.state.name(),
        config.state.n,
        config.state.l,
        config.state.m,
        config.grid.size,
        config.grid.size,
        config.grid.max_radius
    );

    let engine = HydrogenEngine {
        parallel: config.parallel,
    };
    let field = engine.density_field(config.state, config.grid)?;
    info!("peak density {:e}", field.max());

    emit(&config, &field)
}

fn open_sink(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn emit(config: &RunConfig, field: &DensityField) -> Result<()> {
    let output = &config.output;
    let path = output.path.as_deref();

    match output.format {
        OutputFormat::Text => write_text(field, open_sink(path)?)?,
        OutputFormat::Json => write_json(field, open_sink(path)?)?,
        OutputFormat::Png => {
            let path = path.ok_or_else(|| {
                DensityError::Config("png output requires an output path".to_string())
            })?;
            save_heatmap(field, path)?;
        }
        OutputFormat::Points => {
            let points = match output.threshold {
                Some(threshold) => points_above(field, threshold),
                None => sample_points(field, output.samples, output.seed),
            };
            info!("{} points", points.len());
            let mut sink = open_sink(path)?;
            serde_json::to_writer(&mut sink, &points)?;
            writeln!(sink)?;
            sink.flush()?;
        }
    }

    if let Some(path) = path {
        info!("wrote {:?} output to {}", output.format, path.display());
    }
    Ok(())
}
