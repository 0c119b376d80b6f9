pub mod error;
pub mod types;

#[cfg(feature = "universe")]
pub mod universe;

#[cfg(feature = "currency")]
pub mod currency;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "optimization")]
pub mod optimization;

#[cfg(feature = "analytics")]
pub mod analytics;

pub use error::PortfolioError;
pub use types::*;

/// Standard result type for all portfolio operations
pub type PortfolioResult<T> = Result<T, PortfolioError>;

/// Annualization factor for daily statistics.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;
