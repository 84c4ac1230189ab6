//! Settings resolution
//!
//! Every plugin declares its fields once as a [`SettingsSchema`]. Values are
//! resolved from defaults, environment variables, command-line arguments and
//! a JSON config file, in that order (File > Args > Env > Defaults), with
//! per-source include and exclude lists.

pub mod args;
pub mod display;
pub mod env;
pub mod error;
pub mod field;
pub mod loader;
pub mod resolve;
pub mod schema;

pub use env::{EnvSource, ProcessEnv};
pub use error::SettingsError;
pub use field::{FieldKind, FieldSpec, FieldValue};
pub use resolve::{ConfigResolver, Origin, ResolvedConfig, ResolvedField};
pub use schema::{SettingsSchema, Source, SourceFilter};
