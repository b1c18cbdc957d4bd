use std::collections::HashMap;

pub type EnvMap = HashMap<String, String>;

mod environment;
#[cfg(feature = "cli")]
mod loader;
mod placeholders;

pub use environment::{EnvVariable, Environment, ENVIRONMENT_NAME, ENVIRONMENT_SCOPE, HOST_KEY};
#[cfg(feature = "cli")]
pub use loader::load_env_file_sync;
pub use placeholders::{resolve_variables, unresolved_variables};
