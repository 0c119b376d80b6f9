use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Invalid input ({field}): {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown currency for ticker '{ticker}': add it to the asset registry")]
    UnknownCurrency { ticker: String },

    #[error("Missing ESG score for ticker '{ticker}'")]
    MissingEsgScore { ticker: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraints(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PortfolioError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioError::SerializationError(e.to_string())
    }
}

impl From<chrono::ParseError> for PortfolioError {
    fn from(e: chrono::ParseError) -> Self {
        PortfolioError::DateError(e.to_string())
    }
}
