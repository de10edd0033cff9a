//! Oracle implementations

pub mod structural;

pub use structural::StructuralOracle;
