//! The native graphics API seam.
//!
//! Everything above this module talks to the GPU exclusively through [`GraphicsApi`],
//! an immediate-mode style interface: global toggles, buffer objects addressed by
//! handle, programs, vertex arrays and indexed draws. Enum-valued state travels as
//! native codes from [`gl`].
//!
//! Implementations:
//! - [`RecordingApi`]: headless, records every call (tests, `--headless` runs)
//! - `wgpu_backend::WgpuApi`: emulates the interface on top of wgpu

pub mod gl;
mod recording;

pub use recording::{Call, RecordingApi};

use crate::coords::Viewport;
use crate::gfx::mesh::VertexFormat;

// ── handles ───────────────────────────────────────────────────────────────

/// Native buffer object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferHandle(pub u32);

/// Linked shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub u32);

/// Vertex array object: a vertex buffer, an index buffer and the format binding them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexArrayHandle(pub u32);

// ── state vocabulary ──────────────────────────────────────────────────────

/// Fixed-function toggles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Capability {
    DepthTest,
    Blend,
    SampleAlphaToCoverage,
    CullFace,
    PolygonOffsetFill,
}

/// Integer-valued state readable through [`GraphicsApi::get_integer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StateQuery {
    DepthFunc,
    BlendSrc,
    BlendDst,
}

/// Which attachments [`GraphicsApi::clear`] resets.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR_DEPTH: Self = Self { color: true, depth: true };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

/// Update frequency hint for buffer uploads.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    /// Written once (or rarely), drawn many times.
    #[default]
    Static,
    /// Rewritten every frame or so.
    Dynamic,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    Points,
}

// ── driver info ───────────────────────────────────────────────────────────

/// Identification strings reported by the driver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DriverInfo {
    pub vendor: String,
    pub renderer: String,
    pub backend: String,

    /// Shader compiler only copes with pre-uniform-buffer GLSL (`#version 130`).
    pub legacy_glsl: bool,
}

impl DriverInfo {
    /// Builds driver info, flagging Intel drivers as needing legacy GLSL.
    pub fn new(
        vendor: impl Into<String>,
        renderer: impl Into<String>,
        backend: impl Into<String>,
    ) -> Self {
        let vendor = vendor.into();
        let renderer = renderer.into();
        let legacy_glsl = is_intel(&vendor) || is_intel(&renderer);

        Self {
            vendor,
            renderer,
            backend: backend.into(),
            legacy_glsl,
        }
    }

    /// Driver info for backends without a real device behind them.
    pub fn headless() -> Self {
        Self::new("kiln", "headless", "none")
    }

    pub fn needs_legacy_glsl(&self) -> bool {
        self.legacy_glsl
    }
}

impl Default for DriverInfo {
    fn default() -> Self {
        DriverInfo::headless()
    }
}

fn is_intel(s: &str) -> bool {
    s.to_ascii_lowercase().contains("intel")
}

// ── programs ──────────────────────────────────────────────────────────────

/// Binds a uniform block (by block name) to a buffer binding slot.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BlockBinding {
    pub block: String,
    pub slot: u32,
}

/// Preprocessed shader stages ready for native compilation.
#[derive(Debug, Clone, Default)]
pub struct ProgramSource {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
    pub blocks: Vec<BlockBinding>,
}

// ── native state shadow ───────────────────────────────────────────────────

/// Fixed-function state as the native side holds it (native enum codes).
///
/// Backends without real global state keep one of these and answer readback from it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NativeState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: u32,
    pub blend: bool,
    pub blend_src: u32,
    pub blend_dst: u32,
    pub alpha_to_coverage: bool,
    pub cull_face: bool,
    pub polygon_offset: bool,
}

impl Default for NativeState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: true,
            depth_func: gl::LESS,
            blend: false,
            blend_src: gl::ONE,
            blend_dst: gl::ZERO,
            alpha_to_coverage: false,
            cull_face: false,
            polygon_offset: false,
        }
    }
}

impl NativeState {
    pub fn is_enabled(&self, cap: Capability) -> bool {
        match cap {
            Capability::DepthTest => self.depth_test,
            Capability::Blend => self.blend,
            Capability::SampleAlphaToCoverage => self.alpha_to_coverage,
            Capability::CullFace => self.cull_face,
            Capability::PolygonOffsetFill => self.polygon_offset,
        }
    }

    pub fn set_enabled(&mut self, cap: Capability, enabled: bool) {
        let flag = match cap {
            Capability::DepthTest => &mut self.depth_test,
            Capability::Blend => &mut self.blend,
            Capability::SampleAlphaToCoverage => &mut self.alpha_to_coverage,
            Capability::CullFace => &mut self.cull_face,
            Capability::PolygonOffsetFill => &mut self.polygon_offset,
        };
        *flag = enabled;
    }

    pub fn get_integer(&self, query: StateQuery) -> u32 {
        match query {
            StateQuery::DepthFunc => self.depth_func,
            StateQuery::BlendSrc => self.blend_src,
            StateQuery::BlendDst => self.blend_dst,
        }
    }
}

// ── the seam ──────────────────────────────────────────────────────────────

/// Immediate-mode graphics interface.
///
/// State-setting calls are assumed to always succeed. Only program creation reports
/// failure; callers treat it as fatal for the material being built.
pub trait GraphicsApi {
    /// Driver identification, used for shader compiler workarounds.
    fn driver(&self) -> &DriverInfo;

    // Readback
    fn is_enabled(&self, cap: Capability) -> bool;
    fn depth_write_mask(&self) -> bool;
    fn get_integer(&self, query: StateQuery) -> u32;

    // Fixed-function state
    fn set_enabled(&mut self, cap: Capability, enabled: bool);
    fn depth_func(&mut self, func: u32);
    fn depth_mask(&mut self, write: bool);
    fn blend_func(&mut self, src: u32, dst: u32);
    fn viewport(&mut self, viewport: Viewport);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, mask: ClearMask);

    // Buffers
    fn create_buffer(&mut self, kind: BufferKind) -> BufferHandle;
    /// Replaces the whole contents of `buffer` with `data`.
    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8], usage: BufferUsage);
    /// Binds a uniform buffer to an indexed binding slot.
    fn bind_buffer_base(&mut self, slot: u32, buffer: BufferHandle);
    fn delete_buffer(&mut self, buffer: BufferHandle);

    // Programs
    fn create_program(&mut self, source: &ProgramSource) -> anyhow::Result<ProgramHandle>;
    fn use_program(&mut self, program: ProgramHandle);
    fn delete_program(&mut self, program: ProgramHandle);

    // Geometry
    fn create_vertex_array(
        &mut self,
        format: &VertexFormat,
        vertices: BufferHandle,
        indices: BufferHandle,
    ) -> VertexArrayHandle;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);
    /// Drops the binding only; the buffers it refers to are deleted separately.
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);
    fn draw_elements(&mut self, primitive: Primitive, first_index: u32, count: u32, base_vertex: i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intel_vendor_needs_legacy_glsl() {
        assert!(DriverInfo::new("Intel", "Mesa Intel(R) UHD 620", "gl").needs_legacy_glsl());
        assert!(DriverInfo::new("0x8086", "Intel(R) HD Graphics 4000", "gl").needs_legacy_glsl());
        assert!(!DriverInfo::new("NVIDIA Corporation", "GeForce GTX 1060", "gl").needs_legacy_glsl());
    }

    #[test]
    fn native_state_defaults_match_gl() {
        let s = NativeState::default();
        assert!(!s.is_enabled(Capability::DepthTest));
        assert!(s.depth_write);
        assert_eq!(s.get_integer(StateQuery::DepthFunc), gl::LESS);
        assert_eq!(s.get_integer(StateQuery::BlendSrc), gl::ONE);
        assert_eq!(s.get_integer(StateQuery::BlendDst), gl::ZERO);
    }

    #[test]
    fn native_state_toggles_one_capability() {
        let mut s = NativeState::default();
        s.set_enabled(Capability::CullFace, true);
        assert!(s.is_enabled(Capability::CullFace));
        assert!(!s.is_enabled(Capability::Blend));
    }
}
