//! Integration tests for meshpress-pipeline
//!
//! These tests run whole jobs against files on disk: parsing, triangulation,
//! decimation, writing and texture compression together.

use meshpress_io::{MeshReader, ObjReader};
use meshpress_pipeline::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CUBE: &str = "\
# unit cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 4/4 3/3 2/2
f 5/1 6/2 7/3 8/4
f 1/1 2/2 6/3 5/4
f 2/1 3/2 7/3 6/4
f 3/1 4/2 8/3 7/4
f 4/1 1/2 5/3 8/4
";

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Flat `n x n` grid of quads
fn quad_grid_obj(n: usize) -> String {
    let mut obj = String::new();
    for y in 0..=n {
        for x in 0..=n {
            writeln!(obj, "v {x} {y} 0").unwrap();
        }
    }
    for y in 0..n {
        for x in 0..n {
            let tl = y * (n + 1) + x + 1;
            let tr = tl + 1;
            let bl = tl + n + 1;
            let br = bl + 1;
            writeln!(obj, "f {tl} {bl} {br} {tr}").unwrap();
        }
    }
    obj
}

fn write_texture(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join(name);
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
    .save(&path)
    .unwrap();
    path
}

fn read_output(path: &Path) -> meshpress_core::PolygonMesh {
    ObjReader::read_mesh(path).unwrap()
}

#[test]
fn test_cube_with_texture_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);
    let texture_in = write_texture(&dir, "cube.png", 300, 150);
    let mesh_out = dir.path().join("cube_simplified.obj");
    let texture_out = dir.path().join("cube_compressed.jpg");

    let config = PipelineConfig {
        texture: TextureOptions::new(40, (100, 100)),
        ..Default::default()
    };
    let job = Job::new(&mesh_in)
        .with_mesh_output(&mesh_out)
        .with_texture(&texture_in, &texture_out);

    let report = Pipeline::new(config).run(&job).unwrap();

    assert_eq!(report.input_vertices, 8);
    assert_eq!(report.input_faces, 6);
    assert_eq!(report.input_triangles, 12);
    assert_eq!(report.target_triangles, 6);
    assert_eq!(report.output_triangles, 6);
    assert_eq!(report.output_vertices, 5);
    assert!(report.had_uvs);
    assert_eq!(
        report.stages,
        vec![
            Stage::Parsed,
            Stage::Triangulated,
            Stage::Simplified,
            Stage::Written,
            Stage::TextureCompressed
        ]
    );

    let written = read_output(&mesh_out);
    assert_eq!(written.face_count(), report.output_triangles);
    assert_eq!(written.vertex_count(), report.output_vertices);
    assert!(written.faces.iter().all(|f| f.len() == 3));
    assert!(written.uvs.is_empty());

    let texture = report.texture.unwrap();
    assert_eq!(texture.original, (300, 150));
    assert_eq!(texture.output, (100, 50));
    assert_eq!(image::image_dimensions(&texture_out).unwrap(), (100, 50));
}

#[test]
fn test_written_mesh_has_only_vertices_and_triangles() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);
    let mesh_out = dir.path().join("out.obj");

    Pipeline::default()
        .run(&Job::new(&mesh_in).with_mesh_output(&mesh_out))
        .unwrap();

    let text = std::fs::read_to_string(&mesh_out).unwrap();
    for line in text.lines().filter(|l| !l.starts_with('#')) {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => assert_eq!(tokens.count(), 3),
            Some("f") => {
                let refs: Vec<&str> = tokens.collect();
                assert_eq!(refs.len(), 3);
                assert!(refs.iter().all(|t| t.parse::<usize>().is_ok()));
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}

#[test]
fn test_quad_grid_reaches_target() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "grid.obj", &quad_grid_obj(10));
    let mesh_out = dir.path().join("grid_out.obj");

    let report = Pipeline::default()
        .run(&Job::new(&mesh_in).with_mesh_output(&mesh_out))
        .unwrap();

    assert_eq!(report.input_triangles, 200);
    assert_eq!(report.target_triangles, 100);
    assert!(report.output_triangles <= 100);
    assert!(report.output_triangles >= 99);
    assert!(!report.had_uvs);
}

#[test]
fn test_decimation_factor_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "grid.obj", &quad_grid_obj(10));
    let config_path = write_file(&dir, "meshpress.toml", "decimation_factor = 0.7\n");

    let config = PipelineConfig::from_toml_file(&config_path).unwrap();
    let report = Pipeline::new(config).run(&Job::new(&mesh_in)).unwrap();
    assert_eq!(report.target_triangles, 140);
    assert!(report.output_triangles <= 140);
}

#[test]
fn test_repeated_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut obj = quad_grid_obj(8);
    // Bend the grid so collapse costs differ
    obj = obj
        .lines()
        .map(|line| match line.strip_prefix("v ") {
            Some(rest) => {
                let c: Vec<f32> = rest.split_whitespace().map(|t| t.parse().unwrap()).collect();
                format!("v {} {} {}\n", c[0], c[1], (c[0] * 0.4).sin() * (c[1] * 0.3).cos())
            }
            None => format!("{line}\n"),
        })
        .collect();
    let mesh_in = write_file(&dir, "bent.obj", &obj);
    let first = dir.path().join("first.obj");
    let second = dir.path().join("second.obj");

    let pipeline = Pipeline::new(PipelineConfig {
        decimation_factor: 0.3,
        ..Default::default()
    });
    pipeline.run(&Job::new(&mesh_in).with_mesh_output(&first)).unwrap();
    pipeline.run(&Job::new(&mesh_in).with_mesh_output(&second)).unwrap();

    assert_eq!(
        std::fs::read_to_string(&first).unwrap(),
        std::fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn test_without_output_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);

    let report = Pipeline::default().run(&Job::new(&mesh_in)).unwrap();
    assert_eq!(
        report.stages,
        vec![Stage::Parsed, Stage::Triangulated, Stage::Simplified]
    );
    assert!(report.texture.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_stage_callback_sees_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);
    let mesh_out = dir.path().join("out.obj");

    let mut seen = Vec::new();
    let report = Pipeline::default()
        .run_with(&Job::new(&mesh_in).with_mesh_output(&mesh_out), |stage| {
            seen.push(stage)
        })
        .unwrap();
    assert_eq!(seen, report.stages);
}

#[test]
fn test_parse_error_aborts_job() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "bad.obj", "v 0 0 0\nv 1 0 0\nv 0 one 0\nf 1 2 3\n");
    let mesh_out = dir.path().join("out.obj");

    let err = Pipeline::default()
        .run(&Job::new(&mesh_in).with_mesh_output(&mesh_out))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
    assert!(!mesh_out.exists());
}

#[test]
fn test_missing_mesh_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::default()
        .run(&Job::new(dir.path().join("nope.obj")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
}

#[test]
fn test_pentagon_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(
        &dir,
        "pentagon.obj",
        "v 0 0 0\nv 1 0 0\nv 1.5 1 0\nv 0.5 2 0\nv -0.5 1 0\nf 1 2 3 4 5\n",
    );
    let mesh_out = dir.path().join("out.obj");

    let err = Pipeline::default()
        .run(&Job::new(&mesh_in).with_mesh_output(&mesh_out))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedTopologyError);
    assert!(err.to_string().contains('5'));
    assert!(!mesh_out.exists());
}

#[test]
fn test_single_triangle_cannot_be_decimated() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");

    let err = Pipeline::default().run(&Job::new(&mesh_in)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDecimationError);
}

#[test]
fn test_texture_failure_keeps_written_mesh() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);
    let texture_in = write_file(&dir, "texture.png", "not a png");
    let mesh_out = dir.path().join("out.obj");
    let texture_out = dir.path().join("out.jpg");

    let job = Job::new(&mesh_in)
        .with_mesh_output(&mesh_out)
        .with_texture(&texture_in, &texture_out);
    let err = Pipeline::default().run(&job).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ImageDecodeError);
    assert!(mesh_out.exists());
    assert!(!texture_out.exists());
}

#[test]
fn test_unknown_texture_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);
    let texture_in = write_texture(&dir, "texture.png", 16, 16);

    let job = Job::new(&mesh_in).with_texture(&texture_in, dir.path().join("out.unknown"));
    let err = Pipeline::default().run(&job).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImageWriteError);
}

#[test]
fn test_invalid_quality_rejected_before_mesh_work() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);
    let texture_in = write_texture(&dir, "texture.png", 16, 16);
    let mesh_out = dir.path().join("out.obj");

    let config = PipelineConfig {
        texture: TextureOptions::new(0, (64, 64)),
        ..Default::default()
    };
    let job = Job::new(&mesh_in)
        .with_mesh_output(&mesh_out)
        .with_texture(&texture_in, dir.path().join("out.jpg"));
    let err = Pipeline::new(config).run(&job).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert!(!mesh_out.exists());
}

#[test]
fn test_report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_in = write_file(&dir, "cube.obj", CUBE);

    let report = Pipeline::default().run(&Job::new(&mesh_in)).unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["input_triangles"], 12);
    assert_eq!(json["target_triangles"], 6);
    assert_eq!(json["stages"][0], "Parsed");
    assert!(json["texture"].is_null());
}
