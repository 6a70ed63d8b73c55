//! Run configuration: TOML file values layered under command-line
//! overrides, with defaults that reproduce the 2p reference run.

use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{DensityError, Result};
use crate::grid::GridSpec;
use crate::physics::QuantumNumbers;

pub const DEFAULT_N: u32 = 2;
pub const DEFAULT_L: u32 = 1;
pub const DEFAULT_M: i32 = 0;
pub const DEFAULT_GRID_SIZE: usize = 30;
pub const DEFAULT_MAX_RADIUS: f64 = 1.0;
pub const DEFAULT_SAMPLES: usize = 5_000;
pub const DEFAULT_SEED: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `<value>,` line per grid cell
    #[default]
    Text,
    /// JSON document with rows of densities
    Json,
    /// PNG heatmap (requires an output path)
    Png,
    /// JSON point cloud in the meridian plane
    Points,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileStateConfig {
    pub orbital: Option<String>,
    pub n: Option<u32>,
    pub l: Option<u32>,
    pub m: Option<i32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileGridConfig {
    pub size: Option<usize>,
    pub max_radius: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEngineConfig {
    pub parallel: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub format: Option<OutputFormat>,
    pub path: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub samples: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub state: Option<FileStateConfig>,
    pub grid: Option<FileGridConfig>,
    pub engine: Option<FileEngineConfig>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            DensityError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Values given on the command line; each one beats the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub orbital: Option<String>,
    pub n: Option<u32>,
    pub l: Option<u32>,
    pub m: Option<i32>,
    pub grid_size: Option<usize>,
    pub max_radius: Option<f64>,
    pub parallel: Option<bool>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub samples: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub path: Option<PathBuf>,
    /// Points mode: when set, keep cells above it instead of sampling.
    pub threshold: Option<f64>,
    pub samples: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub state: QuantumNumbers,
    pub grid: GridSpec,
    pub parallel: bool,
    pub output: OutputConfig,
}

pub fn build_config(file: FileConfig, overrides: &Overrides) -> Result<RunConfig> {
    let state_file = file.state.unwrap_or_default();
    let grid_file = file.grid.unwrap_or_default();
    let engine_file = file.engine.unwrap_or_default();
    let output_file = file.output.unwrap_or_default();

    let m = overrides.m.or(state_file.m).unwrap_or(DEFAULT_M);

    // An orbital label seeds n and l; explicit n/l values still win.
    let label = overrides.orbital.as_deref().or(state_file.orbital.as_deref());
    let (base_n, base_l) = match label {
        Some(label) => {
            let preset = QuantumNumbers::preset(label, 0)?;
            (preset.n, preset.l)
        }
        None => (DEFAULT_N, DEFAULT_L),
    };
    let n = overrides.n.or(state_file.n).unwrap_or(base_n);
    let l = overrides.l.or(state_file.l).unwrap_or(base_l);
    let state = QuantumNumbers::new(n, l, m)?;

    let grid = GridSpec::new(
        overrides
            .grid_size
            .or(grid_file.size)
            .unwrap_or(DEFAULT_GRID_SIZE),
        overrides
            .max_radius
            .or(grid_file.max_radius)
            .unwrap_or(DEFAULT_MAX_RADIUS),
    )?;

    let parallel = overrides
        .parallel
        .or(engine_file.parallel)
        .unwrap_or(false);

    let format = overrides
        .format
        .or(output_file.format)
        .unwrap_or_default();
    let path = overrides.output.clone().or(output_file.path);
    if format == OutputFormat::Png && path.is_none() {
        return Err(DensityError::Config(
            "png output requires an output path".to_string(),
        ));
    }

    let output = OutputConfig {
        format,
        path,
        threshold: overrides.threshold.or(output_file.threshold),
        samples: overrides
            .samples
            .or(output_file.samples)
            .unwrap_or(DEFAULT_SAMPLES),
        seed: overrides.seed.or(output_file.seed).unwrap_or(DEFAULT_SEED),
    };

    Ok(RunConfig {
        state,
        grid,
        parallel,
        output,
    })
}
