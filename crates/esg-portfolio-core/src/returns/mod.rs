pub mod builder;
pub mod series;
