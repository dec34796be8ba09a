//! Wavefront OBJ の最小限の読み書き
//!
//! `v` 行だけを解釈し、面や法線などその他の行は触らずに保持する。

use meshloss_normalize::Vertex;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("shape mismatch: mesh has {expected} vertices, got {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Clone, Debug, PartialEq)]
enum Line {
    Vertex,
    Other(String),
}

/// 頂点座標とそれ以外の行
#[derive(Clone, Debug, PartialEq)]
pub struct ObjMesh {
    pub vertices: Vec<Vertex>,
    lines: Vec<Line>,
}

impl ObjMesh {
    pub fn parse(text: &str) -> Result<Self> {
        let mut vertices = Vec::new();
        let mut lines = Vec::new();
        for (n, raw) in text.lines().enumerate() {
            let mut fields = raw.split_whitespace();
            if fields.next() != Some("v") {
                lines.push(Line::Other(raw.to_string()));
                continue;
            }
            let mut p = [0.0f64; 3];
            for (a, slot) in p.iter_mut().enumerate() {
                let field = fields.next().ok_or_else(|| FormatError::Parse {
                    line: n + 1,
                    message: format!("vertex is missing coordinate {}", a),
                })?;
                *slot = field.parse().map_err(|e| FormatError::Parse {
                    line: n + 1,
                    message: format!("bad coordinate {:?}: {}", field, e),
                })?;
            }
            // w や頂点カラーは捨てる
            vertices.push(p);
            lines.push(Line::Vertex);
        }
        Ok(Self { vertices, lines })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// 頂点だけ差し替えて書き出す
    pub fn to_obj_string(&self, vertices: &[Vertex]) -> Result<String> {
        if vertices.len() != self.vertices.len() {
            return Err(FormatError::ShapeMismatch { expected: self.vertices.len(), found: vertices.len() });
        }
        let mut out = String::new();
        let mut next = vertices.iter();
        for line in &self.lines {
            match line {
                Line::Vertex => {
                    if let Some(p) = next.next() {
                        out.push_str(&format!("v {} {} {}\n", p[0], p[1], p[2]));
                    }
                }
                Line::Other(s) => {
                    out.push_str(s);
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }

    pub fn save(&self, path: impl AsRef<Path>, vertices: &[Vertex]) -> Result<()> {
        fs::write(path, self.to_obj_string(vertices)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_CORNER: &str = "# corner\nv 0 0 0\nv 1.5 0 0\nvn 0 0 1\nv 0 2 0 1.0\nf 1//1 2//1 3//1\n";

    #[test]
    fn reads_vertices_and_keeps_faces() {
        let mesh = ObjMesh::parse(CUBE_CORNER).unwrap();
        assert_eq!(mesh.vertices, vec![[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [0.0, 2.0, 0.0]]);
        let out = mesh.to_obj_string(&[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]]).unwrap();
        assert_eq!(out, "# corner\nv 1 1 1\nv 2 2 2\nvn 0 0 1\nv 3 3 3\nf 1//1 2//1 3//1\n");
    }

    #[test]
    fn rewrite_with_same_vertices_is_stable() {
        let mesh = ObjMesh::parse(CUBE_CORNER).unwrap();
        let again = ObjMesh::parse(&mesh.to_obj_string(&mesh.vertices).unwrap()).unwrap();
        assert_eq!(again.vertices, mesh.vertices);
    }

    #[test]
    fn bad_lines_report_position() {
        let err = ObjMesh::parse("v 0 0 0\nv 1 x 0\n").unwrap_err();
        assert!(matches!(err, FormatError::Parse { line: 2, .. }));
        let err = ObjMesh::parse("v 0 0\n").unwrap_err();
        assert!(matches!(err, FormatError::Parse { line: 1, .. }));
    }

    #[test]
    fn vertex_count_must_match() {
        let mesh = ObjMesh::parse(CUBE_CORNER).unwrap();
        assert!(matches!(
            mesh.to_obj_string(&[[0.0; 3]]),
            Err(FormatError::ShapeMismatch { expected: 3, found: 1 })
        ));
    }
}
