pub mod collection;
#[cfg(feature = "cli")]
pub mod config;
#[cfg(feature = "cli")]
pub mod driver;
#[cfg(feature = "cli")]
pub mod engine;
pub mod env;
