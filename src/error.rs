use thiserror::Error;

/// Failures raised while drawing a frame of the market
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("renderer has already been closed")]
    Closed,

    #[error("unable to prepare render output: {0}")]
    Io(#[from] std::io::Error),

    #[error("chart drawing failed: {0}")]
    Draw(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
