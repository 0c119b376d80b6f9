pub mod normalizer;
