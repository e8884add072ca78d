//! OBJ format support
//!
//! Only the records the pipeline needs are interpreted:
//!
//! ```text
//! v x y z [w]          # vertex position, extra components ignored
//! vt u [v [w]]         # texture coordinate
//! f a[/t[/n]] b c ...  # polygon, 1-based vertex references
//! ```
//!
//! Every other record (comments, normals, groups, materials) is skipped.

use crate::{MeshReader, MeshWriter};
use meshpress_core::{Error, Point3f, PolygonMesh, Result, TriangleMesh};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl ObjReader {
    /// Parse an in-memory OBJ document
    pub fn parse_str(source: &str) -> Result<PolygonMesh> {
        Self::parse_reader(source.as_bytes(), Path::new("<memory>"))
    }

    /// Parse OBJ records from any buffered reader; `path` is used for error context
    pub fn parse_reader<R: BufRead>(reader: R, path: &Path) -> Result<PolygonMesh> {
        let mut mesh = PolygonMesh::new();
        // Source line of each face, for index validation errors
        let mut face_lines = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line
                .map_err(|e| Error::parse_at(path, line_no, format!("unreadable line: {e}")))?;
            let mut tokens = line.split_whitespace();

            match tokens.next() {
                Some("v") => {
                    let coords = parse_floats(tokens, path, line_no)?;
                    if coords.len() < 3 {
                        return Err(Error::parse_at(
                            path,
                            line_no,
                            format!("vertex needs 3 coordinates, found {}", coords.len()),
                        ));
                    }
                    mesh.vertices.push(Point3f::new(coords[0], coords[1], coords[2]));
                }
                Some("vt") => {
                    let coords = parse_floats(tokens, path, line_no)?;
                    match coords.as_slice() {
                        [] => {
                            return Err(Error::parse_at(
                                path,
                                line_no,
                                "texture coordinate has no components",
                            ))
                        }
                        [u] => mesh.uvs.push([*u, 0.0]),
                        [u, v, ..] => mesh.uvs.push([*u, *v]),
                    }
                }
                Some("f") => {
                    let face = tokens
                        .map(|token| parse_face_reference(token, path, line_no))
                        .collect::<Result<Vec<usize>>>()?;
                    if face.len() < 3 {
                        return Err(Error::parse_at(
                            path,
                            line_no,
                            format!("face needs at least 3 vertices, found {}", face.len()),
                        ));
                    }
                    mesh.faces.push(face);
                    face_lines.push(line_no);
                }
                _ => {}
            }
        }

        if let Some((face, index)) = mesh.find_invalid_index() {
            return Err(Error::parse_at(
                path,
                face_lines[face],
                format!(
                    "face references vertex {} but only {} vertices are defined",
                    index + 1,
                    mesh.vertices.len()
                ),
            ));
        }

        Ok(mesh)
    }
}

fn parse_floats<'a, I>(tokens: I, path: &Path, line_no: usize) -> Result<Vec<f32>>
where
    I: Iterator<Item = &'a str>,
{
    tokens
        .map(|token| {
            token.parse::<f32>().map_err(|_| {
                Error::parse_at(path, line_no, format!("invalid number '{token}'"))
            })
        })
        .collect()
}

/// Vertex part of `a`, `a/t`, `a//n` or `a/t/n`, converted to a 0-based id
fn parse_face_reference(token: &str, path: &Path, line_no: usize) -> Result<usize> {
    let vertex = token.split('/').next().unwrap_or(token);
    let index: i64 = vertex.parse().map_err(|_| {
        Error::parse_at(path, line_no, format!("invalid face reference '{token}'"))
    })?;
    if index < 1 {
        return Err(Error::parse_at(
            path,
            line_no,
            format!("face reference '{token}' must be a positive 1-based index"),
        ));
    }
    usize::try_from(index - 1).map_err(|_| {
        Error::parse_at(path, line_no, format!("face reference '{token}' is out of range"))
    })
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolygonMesh> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            line: None,
            message: format!("cannot open file: {e}"),
        })?;
        Self::parse_reader(BufReader::new(file), path)
    }
}

impl ObjWriter {
    /// Serialize `v` and triangular `f` records; texture coordinates are not emitted
    pub fn write_to<W: Write>(mesh: &TriangleMesh, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "# meshpress")?;
        writeln!(
            writer,
            "# {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.face_count()
        )?;
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for f in &mesh.faces {
            writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
        }
        writer.flush()
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let path = path.as_ref();
        let write = || -> std::io::Result<()> {
            let file = File::create(path)?;
            Self::write_to(mesh, BufWriter::new(file))
        };
        write().map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshpress_core::ErrorKind;

    const CUBE: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

    #[test]
    fn test_parse_cube() {
        let mesh = ObjReader::parse_str(CUBE).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.faces[0], vec![0, 3, 2, 1]);
        assert!(mesh.uvs.is_empty());
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let noisy = "# exported cube\n\n".to_string()
            + &CUBE
                .lines()
                .map(|l| format!("{l}\n# comment\n   \n"))
                .collect::<String>()
            + "o cube\ns off\nvn 0 0 1\nusemtl skin\n";
        let clean = ObjReader::parse_str(CUBE).unwrap();
        let parsed = ObjReader::parse_str(&noisy).unwrap();
        assert_eq!(clean, parsed);
    }

    #[test]
    fn test_face_sub_indices_ignored() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2//1 3/3\n";
        let mesh = ObjReader::parse_str(src).unwrap();
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
        assert_eq!(mesh.uvs.len(), 3);
        assert_relative_eq!(mesh.uvs[1][0], 1.0);
    }

    #[test]
    fn test_extra_vertex_components_ignored() {
        let mesh = ObjReader::parse_str("v 1 2 3 1.0 0.5 0.5 0.5\nvt 0.25\n").unwrap();
        assert_eq!(mesh.vertices[0], Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.uvs[0], [0.25, 0.0]);
    }

    #[test]
    fn test_polygon_faces_kept_whole() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0.5 2 0\nv 0 1 0\nf 1 2 3 4 5\n";
        let mesh = ObjReader::parse_str(src).unwrap();
        assert_eq!(mesh.faces[0].len(), 5);
    }

    #[test]
    fn test_bad_vertex_is_parse_error() {
        let err = ObjReader::parse_str("v 0 0 0\nv 1 x 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        match err {
            Error::Parse { line, message, .. } => {
                assert_eq!(line, Some(2));
                assert!(message.contains("'x'"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_short_vertex_is_parse_error() {
        let err = ObjReader::parse_str("v 0 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_out_of_range_face_is_parse_error() {
        let err = ObjReader::parse_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap_err();
        match err {
            Error::Parse { line, message, .. } => {
                assert_eq!(line, Some(4));
                assert!(message.contains("vertex 4"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_zero_and_negative_references_rejected() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\n";
        assert!(ObjReader::parse_str(&format!("{src}f 0 1 2\n")).is_err());
        assert!(ObjReader::parse_str(&format!("{src}f -1 -2 -3\n")).is_err());
        assert!(ObjReader::parse_str(&format!("{src}f 1/2/3 x 3\n")).is_err());
    }

    #[test]
    fn test_degenerate_face_arity_rejected() {
        let err = ObjReader::parse_str("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let err = ObjReader::read_mesh("definitely/not/here.obj").unwrap_err();
        match err {
            Error::Parse { path, line, .. } => {
                assert!(path.ends_with("here.obj"));
                assert_eq!(line, None);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.5, 0.0, -2.25),
                Point3f::new(0.0, 1.0, 0.125),
            ],
            vec![[0, 1, 2]],
        );
        ObjWriter::write_mesh(&mesh, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("f 1 2 3"));
        assert!(!text.contains("vt"));

        let loaded = ObjReader::read_mesh(&path).unwrap();
        assert_eq!(loaded.vertices, mesh.vertices);
        assert_eq!(loaded.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_write_to_missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.obj");
        let err = ObjWriter::write_mesh(&TriangleMesh::new(), &path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteError);
    }
}
