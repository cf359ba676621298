use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Run-level failures. Individual chunk failures never surface here; they
/// become failure markers in the report.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Output writer failed: {0}")]
    Writer(#[from] WriterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chunker error: {0}")]
    Chunker(#[from] codedoc_chunker::ChunkerError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] codedoc_generation::SchedulerError),

    /// Paths name chunks and documents, so one path may appear once per run
    #[error("File provider yielded {0} more than once")]
    DuplicatePath(String),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
