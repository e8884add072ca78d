//! Job execution
//!
//! A job moves through `Parsed -> Triangulated -> Simplified -> Written`,
//! then optionally `TextureCompressed`. The first failing stage aborts the
//! job; files written by earlier stages are left in place.

use crate::config::PipelineConfig;
use meshpress_core::{Point3f, Result};
use meshpress_simplification::{decimation_target, triangulate, EdgeCollapseSimplifier, MeshSimplifier};
use meshpress_texture::TextureReport;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Completed step of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Parsed,
    Triangulated,
    Simplified,
    Written,
    TextureCompressed,
}

/// Paths for one job
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Job {
    pub mesh_input: PathBuf,
    /// Where to write the simplified mesh; without it nothing is written
    pub mesh_output: Option<PathBuf>,
    pub texture_input: Option<PathBuf>,
    pub texture_output: Option<PathBuf>,
}

impl Job {
    pub fn new<P: Into<PathBuf>>(mesh_input: P) -> Self {
        Self {
            mesh_input: mesh_input.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.mesh_output = Some(path.into());
        self
    }

    pub fn with_texture<P: Into<PathBuf>, Q: Into<PathBuf>>(mut self, input: P, output: Q) -> Self {
        self.texture_input = Some(input.into());
        self.texture_output = Some(output.into());
        self
    }

    /// Texture input and output, when both are given
    pub fn texture_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.texture_input, &self.texture_output) {
            (Some(input), Some(output)) => Some((input.as_path(), output.as_path())),
            _ => None,
        }
    }
}

/// What a finished job did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub input_vertices: usize,
    /// Faces as parsed, before triangulation
    pub input_faces: usize,
    pub input_triangles: usize,
    pub target_triangles: usize,
    pub output_vertices: usize,
    pub output_triangles: usize,
    /// Axis-aligned `(min, max)` of the simplified mesh
    pub output_bounds: Option<(Point3f, Point3f)>,
    /// Texture coordinates were present in the source (they are not carried over)
    pub had_uvs: bool,
    pub stages: Vec<Stage>,
    pub texture: Option<TextureReport>,
}

/// Runs jobs with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, job: &Job) -> Result<JobReport> {
        self.run_with(job, |_| {})
    }

    /// Run a job, calling `on_stage` as each stage completes
    pub fn run_with<F>(&self, job: &Job, mut on_stage: F) -> Result<JobReport>
    where
        F: FnMut(Stage),
    {
        let texture_paths = job.texture_paths();
        if texture_paths.is_some() {
            self.config.texture.validate()?;
        }

        let mut stages = Vec::with_capacity(5);
        let mut complete = |stage: Stage, stages: &mut Vec<Stage>| {
            stages.push(stage);
            on_stage(stage);
        };

        let polygons = meshpress_io::read_mesh(&job.mesh_input)?;
        complete(Stage::Parsed, &mut stages);

        let mesh = triangulate(&polygons)?;
        complete(Stage::Triangulated, &mut stages);

        let target_triangles = decimation_target(mesh.face_count(), self.config.decimation_factor)?;
        let simplifier = EdgeCollapseSimplifier::from(&self.config.simplifier);
        let simplified = simplifier.simplify(&mesh, self.config.decimation_factor)?;
        complete(Stage::Simplified, &mut stages);

        if let Some(output) = &job.mesh_output {
            meshpress_io::write_mesh(&simplified, output)?;
            complete(Stage::Written, &mut stages);
        }

        let texture = match texture_paths {
            Some((input, output)) => {
                let report = meshpress_texture::compress(input, output, &self.config.texture)?;
                complete(Stage::TextureCompressed, &mut stages);
                Some(report)
            }
            None => None,
        };

        Ok(JobReport {
            input_vertices: polygons.vertex_count(),
            input_faces: polygons.face_count(),
            input_triangles: mesh.face_count(),
            target_triangles,
            output_vertices: simplified.vertex_count(),
            output_triangles: simplified.face_count(),
            output_bounds: simplified.bounding_box(),
            had_uvs: polygons.has_uvs(),
            stages,
            texture,
        })
    }
}
