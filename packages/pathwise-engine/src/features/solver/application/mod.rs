//! Script generation

pub mod encode;

pub use encode::ScriptEncoder;
