//! Native GL-style codes → wgpu types.

use crate::gfx::api::{DriverInfo, NativeState, Primitive};
use crate::gfx::mesh::{AttribType, VertexAttrib};
use crate::gfx::state::{BlendFactor, DepthFn};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// glPolygonOffset(-1, 5)
const POLYGON_OFFSET_UNITS: i32 = 5;
const POLYGON_OFFSET_FACTOR: f32 = -1.0;

pub(crate) fn compare_function(code: u32) -> wgpu::CompareFunction {
    match DepthFn::from_native(code).unwrap_or_default() {
        DepthFn::Never => wgpu::CompareFunction::Never,
        DepthFn::Less => wgpu::CompareFunction::Less,
        DepthFn::Equal => wgpu::CompareFunction::Equal,
        DepthFn::LEqual => wgpu::CompareFunction::LessEqual,
        DepthFn::Greater => wgpu::CompareFunction::Greater,
        DepthFn::NotEqual => wgpu::CompareFunction::NotEqual,
        DepthFn::GEqual => wgpu::CompareFunction::GreaterEqual,
        DepthFn::Always => wgpu::CompareFunction::Always,
    }
}

pub(crate) fn blend_factor(code: u32) -> wgpu::BlendFactor {
    match BlendFactor::from_native(code) {
        Some(BlendFactor::Zero) => wgpu::BlendFactor::Zero,
        Some(BlendFactor::One) | None => wgpu::BlendFactor::One,
        Some(BlendFactor::SrcColor) => wgpu::BlendFactor::Src,
        Some(BlendFactor::OneMinusSrcColor) => wgpu::BlendFactor::OneMinusSrc,
        Some(BlendFactor::SrcAlpha) => wgpu::BlendFactor::SrcAlpha,
        Some(BlendFactor::OneMinusSrcAlpha) => wgpu::BlendFactor::OneMinusSrcAlpha,
        Some(BlendFactor::DstAlpha) => wgpu::BlendFactor::DstAlpha,
        Some(BlendFactor::OneMinusDstAlpha) => wgpu::BlendFactor::OneMinusDstAlpha,
        Some(BlendFactor::DstColor) => wgpu::BlendFactor::Dst,
        Some(BlendFactor::OneMinusDstColor) => wgpu::BlendFactor::OneMinusDst,
        Some(BlendFactor::SrcAlphaSaturate) => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

pub(crate) fn blend_state(state: &NativeState) -> Option<wgpu::BlendState> {
    if !state.blend {
        return None;
    }
    let component = wgpu::BlendComponent {
        src_factor: blend_factor(state.blend_src),
        dst_factor: blend_factor(state.blend_dst),
        operation: wgpu::BlendOperation::Add,
    };
    Some(wgpu::BlendState {
        color: component,
        alpha: component,
    })
}

/// Disabled depth testing means "always pass, never write", as in GL.
pub(crate) fn depth_stencil(state: &NativeState) -> wgpu::DepthStencilState {
    let (depth_write_enabled, depth_compare) = if state.depth_test {
        (state.depth_write, compare_function(state.depth_func))
    } else {
        (false, wgpu::CompareFunction::Always)
    };

    let bias = if state.polygon_offset {
        wgpu::DepthBiasState {
            constant: POLYGON_OFFSET_UNITS,
            slope_scale: POLYGON_OFFSET_FACTOR,
            clamp: 0.0,
        }
    } else {
        wgpu::DepthBiasState::default()
    };

    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled,
        depth_compare,
        stencil: wgpu::StencilState::default(),
        bias,
    }
}

pub(crate) fn primitive_state(primitive: Primitive, state: &NativeState) -> wgpu::PrimitiveState {
    let (topology, strip_index_format) = match primitive {
        Primitive::Triangles => (wgpu::PrimitiveTopology::TriangleList, None),
        Primitive::TriangleStrip => (
            wgpu::PrimitiveTopology::TriangleStrip,
            Some(wgpu::IndexFormat::Uint32),
        ),
        Primitive::Lines => (wgpu::PrimitiveTopology::LineList, None),
        Primitive::Points => (wgpu::PrimitiveTopology::PointList, None),
    };

    wgpu::PrimitiveState {
        topology,
        strip_index_format,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: state.cull_face.then_some(wgpu::Face::Back),
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

pub(crate) fn vertex_format(attrib: &VertexAttrib) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    match (attrib.ty, attrib.components) {
        (AttribType::F32, 1) => Some(F::Float32),
        (AttribType::F32, 2) => Some(F::Float32x2),
        (AttribType::F32, 3) => Some(F::Float32x3),
        (AttribType::F32, 4) => Some(F::Float32x4),
        (AttribType::U8Norm, 1) => Some(F::Unorm8),
        (AttribType::U8Norm, 2) => Some(F::Unorm8x2),
        (AttribType::U8Norm, 4) => Some(F::Unorm8x4),
        _ => None,
    }
}

// ── driver ────────────────────────────────────────────────────────────────

const VENDOR_INTEL: u32 = 0x8086;

fn vendor_name(id: u32) -> String {
    match id {
        VENDOR_INTEL => "Intel".to_string(),
        0x10de => "NVIDIA".to_string(),
        0x1002 => "AMD".to_string(),
        0x106b => "Apple".to_string(),
        _ => format!("0x{id:04x}"),
    }
}

/// Only the GL backend hands shader text to the vendor compiler, so only there does the
/// Intel workaround apply.
pub(crate) fn driver_info(vendor: u32, name: &str, backend: wgpu::Backend) -> DriverInfo {
    let mut info = DriverInfo::new(vendor_name(vendor), name, format!("{backend:?}"));
    info.legacy_glsl = info.legacy_glsl && backend == wgpu::Backend::Gl;
    info
}
