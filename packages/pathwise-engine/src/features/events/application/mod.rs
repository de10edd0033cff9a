//! Event use cases: assembling chains and rendering them for output

pub mod assemble;
pub mod render;

pub use assemble::ChainAssembler;
pub use render::ChainRenderer;
