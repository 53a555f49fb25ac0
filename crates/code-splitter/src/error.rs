use thiserror::Error;

/// Result type for splitter operations
pub type Result<T> = std::result::Result<T, SplitterError>;

/// Errors that can occur while splitting a document
#[derive(Error, Debug)]
pub enum SplitterError {
    /// No grammar is registered for the requested language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The grammar could not produce a syntax tree
    #[error("Parse error: {0}")]
    ParseFailure(String),

    /// The size metric could not measure a byte range
    #[error("Metric error: {0}")]
    MetricFailure(String),

    /// A tokenizer or byte-pair encoder could not be loaded
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    /// A call argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SplitterError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailure(msg.into())
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create a metric error
    pub fn metric(msg: impl Into<String>) -> Self {
        Self::MetricFailure(msg.into())
    }

    /// Create a tokenizer load error
    pub fn tokenizer_unavailable(msg: impl Into<String>) -> Self {
        Self::TokenizerUnavailable(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
