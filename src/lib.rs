// Public API - the registrar and the connector seam it is built on
pub mod db;
pub mod error;
pub mod registrar;

// Internal modules
mod config;

pub use error::RegistrarError;
pub use registrar::{RegistrarArgs, RegistrarArgsBuilder, TableRegistrar};

#[cfg(test)]
mod integ_tests;
