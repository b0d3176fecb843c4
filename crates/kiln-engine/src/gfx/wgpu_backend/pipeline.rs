use std::borrow::Cow;

use anyhow::{Result, anyhow};

use crate::gfx::api::{NativeState, Primitive, ProgramHandle, ProgramSource};
use crate::gfx::mesh::VertexFormat;

use super::compat::to_vulkan_glsl;
use super::conversions;

/// A linked program: both stage modules plus the bind group layout covering its blocks.
pub(crate) struct Program {
    pub label: String,
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub layout: wgpu::PipelineLayout,
    /// Uniform buffer slot read by each binding index.
    pub slots: Vec<u32>,
}

/// Everything a wgpu render pipeline bakes in.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(crate) struct PipelineKey {
    pub program: ProgramHandle,
    pub format: VertexFormat,
    pub primitive: Primitive,
    pub state: NativeState,
    pub color_format: wgpu::TextureFormat,
}

pub(crate) fn compile_program(device: &wgpu::Device, source: &ProgramSource) -> Result<Program> {
    let label = source.label.as_str();
    let vertex = compile_stage(
        device,
        label,
        naga::ShaderStage::Vertex,
        &to_vulkan_glsl(&source.vertex, &source.blocks),
    )?;
    let fragment = compile_stage(
        device,
        label,
        naga::ShaderStage::Fragment,
        &to_vulkan_glsl(&source.fragment, &source.blocks),
    )?;

    let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..source.blocks.len() as u32)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    Ok(Program {
        label: source.label.clone(),
        vertex,
        fragment,
        bind_group_layout,
        layout,
        slots: source.blocks.iter().map(|b| b.slot).collect(),
    })
}

fn compile_stage(
    device: &wgpu::Device,
    label: &str,
    stage: naga::ShaderStage,
    glsl: &str,
) -> Result<wgpu::ShaderModule> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(stage), glsl)
        .map_err(|e| anyhow!("{label} {stage:?} shader:\n{}", e.emit_to_string(glsl)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("{label} {stage:?} shader failed validation:\n{}", e.emit_to_string(glsl)))?;

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
    }))
}

pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    program: &Program,
    key: &PipelineKey,
) -> Result<wgpu::RenderPipeline> {
    let attributes = key
        .format
        .attribs()
        .iter()
        .enumerate()
        .map(|(location, a)| {
            let format = conversions::vertex_format(a)
                .ok_or_else(|| anyhow!("unsupported vertex attribute {a:?}"))?;
            Ok(wgpu::VertexAttribute {
                format,
                offset: a.offset as u64,
                shader_location: location as u32,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let buffers = [wgpu::VertexBufferLayout {
        array_stride: key.format.stride() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    }];

    Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&program.label),
        layout: Some(&program.layout),

        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend: conversions::blend_state(&key.state),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: conversions::primitive_state(key.primitive, &key.state),
        depth_stencil: Some(conversions::depth_stencil(&key.state)),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    }))
}
