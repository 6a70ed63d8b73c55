use log::LevelFilter;

/// Map `-v` counts and `-q` onto a level filter. With neither flag the
/// `RUST_LOG` environment variable decides, falling back to warnings.
pub fn level_for(verbosity: u8, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        return Some(LevelFilter::Off);
    }
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

pub fn setup_logging(verbosity: u8, quiet: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    if let Some(level) = level_for(verbosity, quiet) {
        builder.filter_level(level);
    }
    // A logger may already be installed (tests, embedding callers).
    let _ = builder.format_target(false).try_init();
}
