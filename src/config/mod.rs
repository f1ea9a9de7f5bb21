/// Configuration loaded from TOML with built-in defaults

pub mod settings;

pub use settings::*;
