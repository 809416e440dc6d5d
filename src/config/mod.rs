// Re-export all items from the submodules
mod build_info;
mod collection_config;
mod env_vars;

pub use build_info::BuildInfo;

pub use collection_config::{load_or_create_config, LogsnapConfig};

pub use env_vars::{expand_home, expand_path, home_dir, parse_unix_env_vars};
