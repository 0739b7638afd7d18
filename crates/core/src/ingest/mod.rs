pub mod collector;
pub mod enricher;
pub mod pace;
pub mod provider;
pub mod tmdb;
pub mod types;
