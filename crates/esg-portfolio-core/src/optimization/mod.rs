pub mod linalg;
pub mod objective;
pub mod optimizer;
pub mod sqp;
