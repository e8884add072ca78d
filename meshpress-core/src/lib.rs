//! Core data structures for meshpress
//!
//! This crate provides the mesh types shared by the parser, the simplifier
//! and the pipeline, along with the error type every stage reports through.

pub mod point;
pub mod mesh;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use error::*;
