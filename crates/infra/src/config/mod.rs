//! Configuration loading and validation
//!
//! The relay resolves its configuration once at startup: an explicit path
//! wins, otherwise standard locations are probed. After parsing, the
//! selected environment can be overridden with `PORELAY_ENVIRONMENT` and
//! the result is validated before any file is touched.

pub mod loader;

pub use loader::{check_private_key, ensure_directories, load, probe_config_paths, validate};
