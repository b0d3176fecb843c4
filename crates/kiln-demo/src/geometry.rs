//! Procedural arena geometry.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use kiln_engine::gfx::mesh::{AttribType, VertexFormat};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [u8; 4],
}

impl Vertex {
    /// Position, normal, normalized RGBA8 color.
    pub fn format() -> VertexFormat {
        VertexFormat::new()
            .with(AttribType::F32, 3)
            .with(AttribType::F32, 3)
            .with(AttribType::U8Norm, 4)
    }
}

/// Indexed triangles with indices local to the part.
#[derive(Debug, Default, Clone)]
pub struct Part {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Part {
    /// Quad centred on `center`, spanned by half-axes `u` and `v`. Front face is `u × v`.
    pub fn quad(&mut self, center: Vec3, u: Vec3, v: Vec3, color: [u8; 4]) {
        self.quad_with_alpha(center, u, v, color, [color[3]; 4]);
    }

    /// Like [`Part::quad`] with per-corner alpha, corners in order
    /// `-u-v`, `+u-v`, `+u+v`, `-u+v`.
    pub fn quad_with_alpha(&mut self, center: Vec3, u: Vec3, v: Vec3, color: [u8; 4], alpha: [u8; 4]) {
        let normal = u.cross(v).normalize_or_zero().to_array();
        let base = self.vertices.len() as u32;
        let corners = [center - u - v, center + u - v, center + u + v, center - u + v];

        for (corner, a) in corners.iter().zip(alpha) {
            self.vertices.push(Vertex {
                position: corner.to_array(),
                normal,
                color: [color[0], color[1], color[2], a],
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Axis-aligned box, faces pointing out.
    pub fn cuboid(&mut self, center: Vec3, half: Vec3, color: [u8; 4]) {
        let (x, y, z) = (Vec3::X * half.x, Vec3::Y * half.y, Vec3::Z * half.z);
        // (normal, u, v) with u × v along the normal
        let faces = [(x, y, z), (-x, z, y), (y, z, x), (-y, x, z), (z, x, y), (-z, y, x)];
        for (n, u, v) in faces {
            self.quad(center + n, u, v, color);
        }
    }
}

// ── arena ─────────────────────────────────────────────────────────────────

const SAND: [u8; 4] = [196, 170, 120, 255];
const STONE: [u8; 4] = [150, 140, 130, 255];
const GLASS: [u8; 4] = [120, 190, 220, 90];
const GATE: [u8; 4] = [255, 140, 60, 255];
const FLAG_COLORS: [[u8; 3]; 3] = [[200, 40, 40], [40, 90, 200], [230, 200, 50]];

pub const PILLARS: usize = 12;
const PILLAR_RING: f32 = 600.0;
const PILLAR_HALF: Vec3 = Vec3::new(20.0, 90.0, 20.0);

/// Inside-out unit-ish cube around the origin; only its directions matter.
pub fn sky() -> Part {
    let mut part = Part::default();
    let color = [255; 4];
    let (x, y, z) = (Vec3::X * 10.0, Vec3::Y * 10.0, Vec3::Z * 10.0);
    // v × u: faces point inwards
    for (n, u, v) in [(x, y, z), (-x, z, y), (y, z, x), (-y, x, z), (z, x, y), (-z, y, x)] {
        part.quad(n, v, u, color);
    }
    part
}

/// Ground plane plus a ring of pillars.
pub fn opaque() -> Part {
    let mut part = Part::default();
    part.quad(Vec3::ZERO, Vec3::Z * 1000.0, Vec3::X * 1000.0, SAND);

    for (i, at) in ring(PILLARS, PILLAR_RING).enumerate() {
        let color = if i % 2 == 0 { STONE } else { shade(STONE, 0.8) };
        part.cuboid(at + Vec3::Y * PILLAR_HALF.y, PILLAR_HALF, color);
    }
    part
}

/// One banner per pillar, hanging off its outward side near the top.
pub fn flags() -> Part {
    let mut part = Part::default();
    for (i, at) in ring(PILLARS, PILLAR_RING).enumerate() {
        let out = at.normalize_or_zero();
        let [r, g, b] = FLAG_COLORS[i % FLAG_COLORS.len()];
        let center = at + out * (PILLAR_HALF.x + 30.0) + Vec3::Y * (PILLAR_HALF.y * 2.0 - 30.0);
        // pole edge is -u; it stays pinned
        part.quad_with_alpha(center, out * 30.0, Vec3::Y * 20.0, [r, g, b, 255], [255, 0, 0, 255]);
    }
    part
}

/// Glass panes between every other pair of pillars.
pub fn transparent() -> Part {
    let mut part = Part::default();
    let pillars: Vec<Vec3> = ring(PILLARS, PILLAR_RING).collect();
    for i in (0..PILLARS).step_by(2) {
        let (a, b) = (pillars[i], pillars[(i + 1) % PILLARS]);
        let center = (a + b) * 0.5 + Vec3::Y * 60.0;
        let u = (b - a) * 0.5 - (b - a).normalize_or_zero() * PILLAR_HALF.x;
        part.quad(center, u, Vec3::Y * 60.0, GLASS);
    }
    part
}

/// Four gates at the cardinal points, just inside the boundary.
pub fn gates() -> Part {
    let mut part = Part::default();
    for at in ring(4, 720.0) {
        let inward = -at.normalize_or_zero();
        let u = Vec3::Y.cross(inward) * 60.0;
        part.quad(at + Vec3::Y * 80.0, u, Vec3::Y * 80.0, GATE);
    }
    part
}

fn ring(count: usize, radius: f32) -> impl Iterator<Item = Vec3> {
    (0..count).map(move |i| {
        let a = i as f32 / count as f32 * std::f32::consts::TAU;
        Vec3::new(a.cos() * radius, 0.0, a.sin() * radius)
    })
}

fn shade(color: [u8; 4], k: f32) -> [u8; 4] {
    let s = |c: u8| (c as f32 * k) as u8;
    [s(color[0]), s(color[1]), s(color[2]), color[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_matches_its_format() {
        assert_eq!(std::mem::size_of::<Vertex>() as u32, Vertex::format().stride());
    }

    #[test]
    fn quad_faces_along_cross_product() {
        let mut part = Part::default();
        part.quad(Vec3::ZERO, Vec3::X, Vec3::Y, [0; 4]);
        assert_eq!(part.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(part.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn cuboid_normals_point_outward() {
        let mut part = Part::default();
        part.cuboid(Vec3::ZERO, Vec3::splat(1.0), [0; 4]);
        assert_eq!((part.vertices.len(), part.indices.len()), (24, 36));
        for v in &part.vertices {
            let p = Vec3::from_array(v.position);
            assert!(p.dot(Vec3::from_array(v.normal)) > 0.0);
        }
    }

    #[test]
    fn sky_faces_point_inward() {
        for v in &sky().vertices {
            let p = Vec3::from_array(v.position);
            assert!(p.dot(Vec3::from_array(v.normal)) < 0.0);
        }
    }

    #[test]
    fn ground_faces_up() {
        assert_eq!(opaque().vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn one_flag_per_pillar() {
        assert_eq!(flags().indices.len(), PILLARS * 6);
        assert_eq!(transparent().indices.len(), PILLARS / 2 * 6);
        assert_eq!(gates().indices.len(), 4 * 6);
    }
}
