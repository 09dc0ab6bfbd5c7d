//! File-backed module host whose modules pull in others with `@import` directives

pub mod directive;
pub mod script;

#[cfg(test)]
pub mod tests;

pub use directive::parse_imports;
pub use script::{LoadedModule, ScriptHost, MODULE_EXTENSION};
