//! Configuration for the camera connection.
//!
//! Settings come from a TOML file (by default
//! `~/.config/grctl/config.toml`), then the `GR_HOST` environment variable,
//! then command-line flags.

mod loader;
mod path;
mod schema;

pub use loader::{HOST_ENV, load_config, load_config_file, load_config_from_str};
pub use path::{default_config_path, expand_home, home_dir};
pub use schema::{CameraConfig, DEFAULT_HOST};
