//! Domain error types.

/// Top-level error type for pricecast.
#[derive(Debug, thiserror::Error)]
pub enum PricecastError {
    #[error("data integrity violation: {reason}")]
    DataIntegrity { reason: String },

    #[error("insufficient data in {stage}: have {have} rows, need {need}")]
    InsufficientData {
        stage: String,
        have: usize,
        need: usize,
    },

    #[error("schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    #[error("numeric computation produced a non-finite value: {context}")]
    NumericComputation { context: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("fetch error: {reason}")]
    Fetch { reason: String },

    #[error("note generation error: {reason}")]
    NoteGeneration { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PricecastError> for std::process::ExitCode {
    fn from(err: &PricecastError) -> Self {
        let code: u8 = match err {
            PricecastError::Io(_) => 1,
            PricecastError::ConfigParse { .. }
            | PricecastError::ConfigMissing { .. }
            | PricecastError::ConfigInvalid { .. } => 2,
            PricecastError::Database { .. } | PricecastError::DatabaseQuery { .. } => 3,
            PricecastError::DataIntegrity { .. } | PricecastError::NumericComputation { .. } => 4,
            PricecastError::InsufficientData { .. } => 5,
            PricecastError::SchemaMismatch { .. } => 6,
            PricecastError::Fetch { .. } => 7,
            PricecastError::NoteGeneration { .. } => 8,
        };
        std::process::ExitCode::from(code)
    }
}
