use std::path::PathBuf;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Rate limited by external API")]
    RateLimited {
        /// Seconds requested by the `Retry-After` header, if any
        retry_after: Option<u64>,
    },

    #[error("External API error (status {status}): {message}")]
    ExternalApi { status: u16, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether a failed API call is worth another attempt
    ///
    /// Rate limiting, timeouts, connection failures and server-side errors are
    /// transient. Everything else (bad key, 404, malformed payload) is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::RateLimited { .. } => true,
            AppError::HttpClient(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::ExternalApi { status, .. } => *status == 408 || *status >= 500,
            _ => false,
        }
    }

    /// Errors raised while reading the source table, before any lookup
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AppError::FileNotFound(_)
                | AppError::MissingColumns(_)
                | AppError::Parse(_)
                | AppError::Csv(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
