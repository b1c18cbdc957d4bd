mod loader;
mod settings;
mod target;

pub use loader::{load_config, load_required_config, ColrunConfig, LoadedConfig, CONFIG_FILE_NAME};
pub use settings::{
    EngineKind, RunSettings, RunSettingsBuilder, SettingsOverrides, DEFAULT_COLLECTION,
    DEFAULT_FIXTURE, DEFAULT_NEWMAN_BIN,
};
pub use target::{resolve_base_url, DEFAULT_PORT};
