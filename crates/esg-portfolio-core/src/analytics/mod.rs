pub mod analyzer;
pub mod performance;
pub mod strategy;
