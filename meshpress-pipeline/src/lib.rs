//! Mesh decimation and texture compression jobs
//!
//! A [`Pipeline`] reads a polygon mesh, triangulates it, decimates it with
//! quadric edge collapse and writes the result; when a texture is supplied it
//! is resized and re-encoded alongside. The library does not log: progress is
//! reported through [`Pipeline::run_with`] and failures through
//! [`meshpress_core::Error`].

pub mod config;
pub mod pipeline;

pub use config::{PipelineConfig, SimplifierOptions};
pub use pipeline::{Job, JobReport, Pipeline, Stage};

pub use meshpress_core::{Error, ErrorKind, Result};
pub use meshpress_texture::{TextureOptions, TextureReport};
