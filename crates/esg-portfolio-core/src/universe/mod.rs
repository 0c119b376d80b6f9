pub mod esg;
pub mod registry;
