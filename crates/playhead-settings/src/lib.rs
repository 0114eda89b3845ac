//! Configuration for the playhead client.
//!
//! Three layers, later ones winning:
//! 1. compiled defaults ([`PlayheadSettings::default()`])
//! 2. `~/.playhead/settings.json`, deep-merged over the defaults
//! 3. `PLAYHEAD_*` environment variables
//!
//! Command-line flags are applied by the binary on top of the result.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_dir, settings_path};
pub use types::{BackendSettings, LoggingSettings, PlayheadSettings, StorageSettings};
