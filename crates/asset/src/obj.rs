//! Wavefront OBJ loader: positions, uvs, normals, n-gon faces (fan-triangulated).
//! Faces that carry no normals get generated ones.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    str::SplitWhitespace,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::mesh::{MeshData, MeshVertex};

pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let mesh = load_obj_from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))?;
    log::info!(
        "Loaded model {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<MeshData> {
    let mut builder = ObjBuilder::default();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("Failed to read line {line_no}"))?;
        builder
            .line(&line)
            .with_context(|| format!("OBJ line {line_no}: '{}'", line.trim()))?;
    }
    builder.finish()
}

pub fn load_obj_from_str(contents: &str) -> Result<MeshData> {
    load_obj_from_reader(io::Cursor::new(contents))
}

/// (position, uv, normal) indices, already resolved to 0-based.
type Corner = (usize, Option<usize>, Option<usize>);

#[derive(Default)]
struct ObjBuilder {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    dedup: HashMap<Corner, u32>,
    mesh: MeshData,
    /// Set once any emitted vertex lacked a normal index.
    missing_normals: bool,
}

impl ObjBuilder {
    fn line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let p = floats::<3>(&mut parts)?;
                self.positions.push(p);
            }
            Some("vt") => {
                let t = floats::<2>(&mut parts)?;
                self.uvs.push(t);
            }
            Some("vn") => {
                let n = floats::<3>(&mut parts)?;
                self.normals.push(n);
            }
            Some("f") => self.face(parts)?,
            // o/g/s/usemtl/mtllib and friends carry nothing we draw.
            _ => {}
        }
        Ok(())
    }

    fn face(&mut self, parts: SplitWhitespace<'_>) -> Result<()> {
        let mut corners = Vec::with_capacity(4);
        for token in parts {
            let corner = self.corner(token)?;
            corners.push(self.vertex_for(corner)?);
        }
        if corners.len() < 3 {
            log::warn!("Skipping degenerate face with {} corner(s)", corners.len());
            return Ok(());
        }
        for k in 1..corners.len() - 1 {
            self.mesh
                .indices
                .extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
        }
        Ok(())
    }

    fn corner(&self, token: &str) -> Result<Corner> {
        let mut fields = token.split('/');
        let pos = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Malformed face element '{token}'"))?;
        let pos = resolve(pos, self.positions.len())?;
        let uv = match fields.next() {
            Some(s) if !s.is_empty() => Some(resolve(s, self.uvs.len())?),
            _ => None,
        };
        let normal = match fields.next() {
            Some(s) if !s.is_empty() => Some(resolve(s, self.normals.len())?),
            _ => None,
        };
        Ok((pos, uv, normal))
    }

    fn vertex_for(&mut self, corner: Corner) -> Result<u32> {
        if let Some(&idx) = self.dedup.get(&corner) {
            return Ok(idx);
        }
        let (pos, uv, normal) = corner;
        let idx = u32::try_from(self.mesh.vertices.len())
            .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
        self.missing_normals |= normal.is_none();
        self.mesh.vertices.push(MeshVertex::new(
            self.positions[pos],
            normal.map_or([0.0, 0.0, 0.0], |n| self.normals[n]),
            uv.map_or([0.0, 0.0], |t| self.uvs[t]),
        ));
        self.dedup.insert(corner, idx);
        Ok(idx)
    }

    fn finish(mut self) -> Result<MeshData> {
        if self.mesh.indices.is_empty() {
            bail!("OBJ contained no triangles");
        }
        if self.missing_normals {
            let generated = self.mesh.smooth_normals();
            for (corner, &idx) in &self.dedup {
                if corner.2.is_none() {
                    self.mesh.vertices[idx as usize].normal = generated[idx as usize];
                }
            }
        }
        Ok(self.mesh)
    }
}

fn floats<const N: usize>(parts: &mut SplitWhitespace<'_>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for (k, slot) in out.iter_mut().enumerate() {
        let token = parts
            .next()
            .ok_or_else(|| anyhow!("Expected {N} numbers, found {k}"))?;
        *slot = token
            .parse()
            .with_context(|| format!("Invalid number '{token}'"))?;
    }
    Ok(out)
}

/// 1-based or negative (relative to the end) OBJ index to 0-based.
fn resolve(token: &str, len: usize) -> Result<usize> {
    let raw: i64 = token
        .parse()
        .with_context(|| format!("Invalid index '{token}'"))?;
    let idx = match raw {
        0 => bail!("OBJ indices are 1-based; found 0"),
        r if r > 0 => r - 1,
        r => len as i64 + r,
    };
    if idx < 0 || idx as usize >= len {
        bail!("OBJ index {raw} out of bounds (len={len})");
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let mesh = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, [0, 1, 2]);
        assert_eq!(mesh.vertices[1].uv, [1.0, 0.0]);
        assert!(mesh.is_valid());
    }

    #[test]
    fn quad_is_fan_triangulated_and_shares_vertices() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\nf 1 3 4\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, [0, 1, 2, 0, 2, 3, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn missing_normals_are_generated() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(src).unwrap();
        for v in &mesh.vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-6, "{:?}", v.normal);
        }
    }

    #[test]
    fn explicit_normals_survive_generation() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nvn 1 0 0\nf 1//1 2//1 3//1\nf 1 2 4\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices[0].normal, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].normal, [1.0, 0.0, 0.0]);
        let generated = mesh.vertices[3].normal;
        assert!((generated[1] + 1.0).abs() < 1e-6, "{generated:?}");
    }

    #[test]
    fn rejects_out_of_range_and_zero_indices() {
        assert!(load_obj_from_str("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").is_err());
        assert!(load_obj_from_str("v 0 zero 0\n").is_err());
    }

    #[test]
    fn empty_model_is_an_error() {
        let err = load_obj_from_str("# nothing\no Empty\nv 0 0 0\n").unwrap_err();
        assert!(err.to_string().contains("no triangles"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_obj_from_path("/nonexistent/courseview/model.obj").unwrap_err();
        assert!(format!("{err:#}").contains("model.obj"));
    }
}
