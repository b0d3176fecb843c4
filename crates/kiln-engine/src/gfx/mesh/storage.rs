use std::fmt;
use std::rc::Rc;

use crate::gfx::api::{
    BufferHandle, BufferKind, BufferUsage, GraphicsApi, Primitive, VertexArrayHandle,
};
use crate::gfx::material::Material;

use super::format::VertexFormat;

// ── errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Part uses a different vertex format than the first part.
    FormatMismatch,
    /// Vertex bytes are not a whole number of vertices.
    StrideMismatch { len: usize, stride: u32 },
    /// Nothing was pushed.
    Empty,
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::FormatMismatch => write!(f, "mesh part vertex format differs from the storage format"),
            MeshError::StrideMismatch { len, stride } => {
                write!(f, "{len} vertex bytes is not a multiple of the {stride}-byte stride")
            }
            MeshError::Empty => write!(f, "mesh storage is empty"),
        }
    }
}

impl std::error::Error for MeshError {}

// ── GPU objects ───────────────────────────────────────────────────────────

/// A vertex buffer, an index buffer and the format binding them. Shared by many meshes.
#[derive(Debug)]
pub struct VertexArray {
    handle: VertexArrayHandle,
    vertices: BufferHandle,
    indices: BufferHandle,
    format: VertexFormat,
    num_vertices: u32,
    num_indices: u32,
}

impl VertexArray {
    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_vertices
    }

    pub fn num_indices(&self) -> u32 {
        self.num_indices
    }

    /// Deletes the vertex array and both of its buffers.
    pub fn release(&self, api: &mut dyn GraphicsApi) {
        api.delete_vertex_array(self.handle);
        api.delete_buffer(self.vertices);
        api.delete_buffer(self.indices);
    }
}

/// An index range drawn from a shared [`VertexArray`].
#[derive(Debug, Clone)]
pub struct Mesh {
    pub buffer: Rc<VertexArray>,
    pub start_index: u32,
    pub num_indices: u32,
    pub base_vertex: i32,
    pub primitive: Primitive,
}

/// A mesh paired with the material it is drawn with.
#[derive(Debug, Clone)]
pub struct RenderAtom {
    pub mesh: Mesh,
    pub material: Rc<Material>,
}

// ── building ──────────────────────────────────────────────────────────────

/// Where a pushed part landed inside a [`MeshStorage`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MeshRange {
    pub start_index: u32,
    pub num_indices: u32,
    pub base_vertex: i32,
    pub primitive: Primitive,
}

/// Append-only builder that packs many mesh parts into one vertex array.
///
/// Indices of each part are relative to the part's own first vertex.
#[derive(Debug, Default)]
pub struct MeshStorage {
    format: Option<VertexFormat>,
    vertices: Vec<u8>,
    indices: Vec<u32>,
    num_vertices: u32,
    ranges: Vec<MeshRange>,
}

impl MeshStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<V: bytemuck::Pod>(
        &mut self,
        format: &VertexFormat,
        vertices: &[V],
        indices: &[u32],
        primitive: Primitive,
    ) -> Result<MeshRange, MeshError> {
        if self.format.as_ref().is_some_and(|f| f != format) {
            return Err(MeshError::FormatMismatch);
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let stride = format.stride();
        if stride == 0 || bytes.len() % stride as usize != 0 {
            return Err(MeshError::StrideMismatch {
                len: bytes.len(),
                stride,
            });
        }

        let range = MeshRange {
            start_index: self.indices.len() as u32,
            num_indices: indices.len() as u32,
            base_vertex: self.num_vertices as i32,
            primitive,
        };

        if self.format.is_none() {
            self.format = Some(format.clone());
        }
        self.vertices.extend_from_slice(bytes);
        self.indices.extend_from_slice(indices);
        self.num_vertices += (bytes.len() / stride as usize) as u32;
        self.ranges.push(range);
        Ok(range)
    }

    pub fn ranges(&self) -> &[MeshRange] {
        &self.ranges
    }

    pub fn num_vertices(&self) -> u32 {
        self.num_vertices
    }

    pub fn num_indices(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Creates one shared vertex array and returns a [`Mesh`] per pushed part, in order.
    pub fn upload(&self, api: &mut dyn GraphicsApi, usage: BufferUsage) -> Result<Vec<Mesh>, MeshError> {
        let format = self.format.as_ref().ok_or(MeshError::Empty)?;

        let vbo = api.create_buffer(BufferKind::Vertex);
        api.upload_buffer(vbo, &self.vertices, usage);
        let ibo = api.create_buffer(BufferKind::Index);
        api.upload_buffer(ibo, bytemuck::cast_slice(&self.indices), usage);
        let handle = api.create_vertex_array(format, vbo, ibo);

        let array = Rc::new(VertexArray {
            handle,
            vertices: vbo,
            indices: ibo,
            format: format.clone(),
            num_vertices: self.num_vertices,
            num_indices: self.num_indices(),
        });

        log::debug!(
            "uploaded {} mesh parts: {} vertices, {} indices",
            self.ranges.len(),
            array.num_vertices,
            array.num_indices
        );

        Ok(self
            .ranges
            .iter()
            .map(|r| Mesh {
                buffer: Rc::clone(&array),
                start_index: r.start_index,
                num_indices: r.num_indices,
                base_vertex: r.base_vertex,
                primitive: r.primitive,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::{Call, RecordingApi};
    use crate::gfx::mesh::AttribType;

    fn position() -> VertexFormat {
        VertexFormat::new().with(AttribType::F32, 3)
    }

    fn tri() -> [[f32; 3]; 3] {
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
    }

    fn quad() -> [[f32; 3]; 4] {
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
    }

    #[test]
    fn ranges_accumulate_across_parts() {
        let mut s = MeshStorage::new();
        let a = s.push(&position(), &tri(), &[0, 1, 2], Primitive::Triangles).unwrap();
        let b = s
            .push(&position(), &quad(), &[0, 1, 2, 0, 2, 3], Primitive::Triangles)
            .unwrap();
        let c = s.push(&position(), &tri(), &[0, 1, 2], Primitive::Triangles).unwrap();

        assert_eq!((a.start_index, a.base_vertex), (0, 0));
        assert_eq!((b.start_index, b.num_indices, b.base_vertex), (3, 6, 3));
        assert_eq!((c.start_index, c.base_vertex), (9, 7));
        assert_eq!(s.num_vertices(), 10);
        assert_eq!(s.num_indices(), 12);
    }

    #[test]
    fn format_mismatch_is_rejected() {
        let mut s = MeshStorage::new();
        s.push(&position(), &tri(), &[0, 1, 2], Primitive::Triangles).unwrap();

        let other = position().with(AttribType::U8Norm, 4);
        let err = s.push(&other, &[[0u8; 16]; 3], &[0, 1, 2], Primitive::Triangles);
        assert_eq!(err, Err(MeshError::FormatMismatch));
        assert_eq!(s.ranges().len(), 1);
    }

    #[test]
    fn partial_vertex_is_rejected() {
        let mut s = MeshStorage::new();
        let err = s.push(&position(), &[0.0f32; 4], &[0], Primitive::Points);
        assert!(matches!(err, Err(MeshError::StrideMismatch { len: 16, stride: 12 })));
    }

    #[test]
    fn upload_shares_one_vertex_array() {
        let mut api = RecordingApi::new();
        let mut s = MeshStorage::new();
        s.push(&position(), &tri(), &[0, 1, 2], Primitive::Triangles).unwrap();
        s.push(&position(), &quad(), &[0, 1, 2, 0, 2, 3], Primitive::Triangles)
            .unwrap();

        let meshes = s.upload(&mut api, BufferUsage::Static).unwrap();
        assert_eq!(meshes.len(), 2);
        assert!(Rc::ptr_eq(&meshes[0].buffer, &meshes[1].buffer));
        assert_eq!(meshes[1].base_vertex, 3);

        let arrays = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateVertexArray(_)))
            .count();
        assert_eq!(arrays, 1);
        assert_eq!(api.buffer_data(BufferHandle(1)).map(<[u8]>::len), Some(7 * 12));
    }

    #[test]
    fn release_deletes_vertex_array_and_buffers() {
        let mut api = RecordingApi::new();
        let mut s = MeshStorage::new();
        s.push(&position(), &tri(), &[0, 1, 2], Primitive::Triangles).unwrap();
        let meshes = s.upload(&mut api, BufferUsage::Static).unwrap();
        let array = &meshes[0].buffer;
        api.clear_calls();

        array.release(&mut api);
        assert_eq!(
            api.calls(),
            &[
                Call::DeleteVertexArray(array.handle()),
                Call::DeleteBuffer(array.vertices),
                Call::DeleteBuffer(array.indices),
            ]
        );
        assert!(api.buffer_data(array.vertices).is_none());
    }

    #[test]
    fn empty_storage_cannot_upload() {
        let mut api = RecordingApi::new();
        assert_eq!(
            MeshStorage::new().upload(&mut api, BufferUsage::Static).unwrap_err(),
            MeshError::Empty
        );
    }
}
