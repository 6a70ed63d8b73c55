use thiserror::Error;

pub type Result<T> = std::result::Result<T, DensityError>;

#[derive(Debug, Error)]
pub enum DensityError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Associated Legendre recurrence divides by zero at k={k} (l={l}, m={m})")]
    Domain { l: u32, m: i32, k: u32 },

    #[error("Factorial of {0} does not fit in 64 bits")]
    FactorialOverflow(u32),

    #[error("Non-finite density {value} at grid cell ({i}, {j})")]
    NonFinite { i: usize, j: usize, value: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DensityError {
    /// True for errors caused by the caller's quantum numbers or grid.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DensityError::InvalidParameter(_))
    }
}
