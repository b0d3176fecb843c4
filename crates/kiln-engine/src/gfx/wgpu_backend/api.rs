use std::collections::HashMap;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::coords::Viewport;
use crate::gfx::api::{
    BufferHandle, BufferKind, BufferUsage, Capability, ClearMask, DriverInfo, GraphicsApi,
    NativeState, Primitive, ProgramHandle, ProgramSource, StateQuery, VertexArrayHandle,
};
use crate::gfx::mesh::VertexFormat;

use super::conversions::{self, DEPTH_FORMAT};
use super::pipeline::{self, PipelineKey, Program};

struct GpuBuffer {
    kind: BufferKind,
    buffer: Option<wgpu::Buffer>,
    size: u64,
}

struct VertexArrayBinding {
    format: VertexFormat,
    vertices: BufferHandle,
    indices: BufferHandle,
}

/// One indexed draw, resolved to concrete wgpu objects at record time.
struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    viewport: Viewport,
    first_index: u32,
    count: u32,
    base_vertex: i32,
}

struct DepthTarget {
    size: (u32, u32),
    view: wgpu::TextureView,
}

/// [`GraphicsApi`] emulated on wgpu.
///
/// Global state lives in a [`NativeState`] shadow. Every draw snapshots that state into a
/// cached render pipeline and is recorded; [`WgpuApi::flush`] replays the recording into a
/// single render pass.
///
/// Buffer uploads go through `Queue::write_buffer`, so they land before the pass runs. A
/// uniform buffer rewritten between two draws of the same frame shows its last contents to
/// both.
pub struct WgpuApi {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    driver: DriverInfo,

    state: NativeState,
    viewport: Viewport,
    clear_color: [f32; 4],
    pending_clear: Option<(ClearMask, [f32; 4])>,
    next_id: u32,

    buffers: HashMap<BufferHandle, GpuBuffer>,
    uniform_slots: HashMap<u32, BufferHandle>,
    programs: HashMap<ProgramHandle, Program>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayBinding>,
    current_program: Option<ProgramHandle>,
    current_vertex_array: Option<VertexArrayHandle>,

    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    bind_groups: HashMap<(ProgramHandle, Vec<BufferHandle>), wgpu::BindGroup>,
    draws: Vec<RecordedDraw>,
    depth: Option<DepthTarget>,

    warned_alpha_to_coverage: bool,
    warned_incomplete_draw: bool,
}

impl WgpuApi {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        adapter: &wgpu::AdapterInfo,
    ) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            color_format,
            driver: conversions::driver_info(adapter.vendor, &adapter.name, adapter.backend),

            state: NativeState::default(),
            viewport: Viewport::default(),
            clear_color: [0.0, 0.0, 0.0, 0.0],
            pending_clear: None,
            next_id: 0,

            buffers: HashMap::new(),
            uniform_slots: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            current_program: None,
            current_vertex_array: None,

            pipelines: HashMap::new(),
            bind_groups: HashMap::new(),
            draws: Vec::new(),
            depth: None,

            warned_alpha_to_coverage: false,
            warned_incomplete_draw: false,
        }
    }

    /// Draws recorded since the last flush.
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    pub fn cached_pipelines(&self) -> usize {
        self.pipelines.len()
    }

    /// Encodes everything recorded since the last flush as one render pass into `target`.
    ///
    /// `size` is the target's size in pixels; the depth attachment follows it.
    pub fn flush(&mut self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, size: (u32, u32)) {
        let clear = self.pending_clear.take();
        let draws = std::mem::take(&mut self.draws);
        if draws.is_empty() && clear.is_none() {
            return;
        }

        let depth_view = self.depth_view(size);

        let color_load = match clear {
            Some((mask, [r, g, b, a])) if mask.color => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            _ => wgpu::LoadOp::Load,
        };
        let depth_load = match clear {
            Some((mask, _)) if mask.depth => wgpu::LoadOp::Clear(1.0),
            _ => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kiln.frame"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &draws {
            let Some([x, y, w, h]) = viewport_rect(draw.viewport, size) else {
                continue;
            };
            rpass.set_viewport(x, y, w, h, 0.0, 1.0);
            rpass.set_pipeline(&draw.pipeline);
            rpass.set_bind_group(0, &draw.bind_group, &[]);
            rpass.set_vertex_buffer(0, draw.vertices.slice(..));
            rpass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(
                draw.first_index..draw.first_index + draw.count,
                draw.base_vertex,
                0..1,
            );
        }
    }

    fn next_handle(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn depth_view(&mut self, size: (u32, u32)) -> wgpu::TextureView {
        if let Some(depth) = &self.depth {
            if depth.size == size {
                return depth.view.clone();
            }
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("kiln.depth"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some(DepthTarget {
            size,
            view: view.clone(),
        });
        view
    }

    fn wgpu_buffer(&self, handle: BufferHandle) -> Result<wgpu::Buffer> {
        self.buffers
            .get(&handle)
            .and_then(|b| b.buffer.clone())
            .with_context(|| format!("buffer {} has no contents", handle.0))
    }

    fn bind_group(&mut self, handle: ProgramHandle) -> Result<wgpu::BindGroup> {
        let program = self.programs.get(&handle).context("unknown program")?;
        let bound = program
            .slots
            .iter()
            .map(|slot| {
                self.uniform_slots
                    .get(slot)
                    .copied()
                    .with_context(|| format!("nothing bound to uniform slot {slot}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let key = (handle, bound);
        if let Some(bind_group) = self.bind_groups.get(&key) {
            return Ok(bind_group.clone());
        }

        let resources = key
            .1
            .iter()
            .map(|&b| self.wgpu_buffer(b))
            .collect::<Result<Vec<_>>>()?;
        let entries: Vec<wgpu::BindGroupEntry> = resources
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.label),
            layout: &program.bind_group_layout,
            entries: &entries,
        });
        self.bind_groups.insert(key, bind_group.clone());
        Ok(bind_group)
    }

    fn pipeline(&mut self, key: PipelineKey) -> Result<wgpu::RenderPipeline> {
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }
        let program = self.programs.get(&key.program).context("unknown program")?;
        let pipeline = pipeline::create_pipeline(&self.device, program, &key)?;
        log::debug!("created pipeline #{} for {}", self.pipelines.len() + 1, program.label);
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    fn record_draw(
        &mut self,
        primitive: Primitive,
        first_index: u32,
        count: u32,
        base_vertex: i32,
    ) -> Result<RecordedDraw> {
        let program = self.current_program.context("no program in use")?;
        let va_handle = self.current_vertex_array.context("no vertex array bound")?;
        let va = self
            .vertex_arrays
            .get(&va_handle)
            .context("unknown vertex array")?;

        let vertices = self.wgpu_buffer(va.vertices)?;
        let indices = self.wgpu_buffer(va.indices)?;
        let key = PipelineKey {
            program,
            format: va.format.clone(),
            primitive,
            state: self.state,
            color_format: self.color_format,
        };

        Ok(RecordedDraw {
            pipeline: self.pipeline(key)?,
            bind_group: self.bind_group(program)?,
            vertices,
            indices,
            viewport: self.viewport,
            first_index,
            count,
            base_vertex,
        })
    }
}

/// Converts a bottom-left-origin viewport into a top-left-origin rect clipped to the target.
/// An invalid viewport covers the whole target, like GL's initial viewport.
fn viewport_rect(viewport: Viewport, (width, height): (u32, u32)) -> Option<[f32; 4]> {
    let viewport = if viewport.is_valid() {
        viewport
    } else {
        Viewport::from_size(width, height)
    };

    let (w, h) = (width as i64, height as i64);
    let top = h - (viewport.y as i64 + viewport.height as i64);

    let x0 = (viewport.x as i64).max(0);
    let x1 = (viewport.x as i64 + viewport.width as i64).min(w);
    let y0 = top.max(0);
    let y1 = (top + viewport.height as i64).min(h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32])
}

impl GraphicsApi for WgpuApi {
    fn driver(&self) -> &DriverInfo {
        &self.driver
    }

    fn is_enabled(&self, cap: Capability) -> bool {
        self.state.is_enabled(cap)
    }

    fn depth_write_mask(&self) -> bool {
        self.state.depth_write
    }

    fn get_integer(&self, query: StateQuery) -> u32 {
        self.state.get_integer(query)
    }

    fn set_enabled(&mut self, cap: Capability, enabled: bool) {
        self.state.set_enabled(cap, enabled);
    }

    fn depth_func(&mut self, func: u32) {
        self.state.depth_func = func;
    }

    fn depth_mask(&mut self, write: bool) {
        self.state.depth_write = write;
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.state.blend_src = src;
        self.state.blend_dst = dst;
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    /// Draws recorded before the clear are dropped.
    fn clear(&mut self, mask: ClearMask) {
        if !mask.color && !mask.depth {
            return;
        }
        self.draws.clear();
        self.pending_clear = Some((mask, self.clear_color));
    }

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self, kind: BufferKind) -> BufferHandle {
        let handle = BufferHandle(self.next_handle());
        self.buffers.insert(
            handle,
            GpuBuffer {
                kind,
                buffer: None,
                size: 0,
            },
        );
        handle
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8], _usage: BufferUsage) {
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            log::warn!("upload to unknown buffer {}", buffer.0);
            return;
        };
        if data.is_empty() {
            entry.buffer = None;
            entry.size = 0;
            return;
        }

        let mut bytes = data.to_vec();
        bytes.resize(data.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
        let size = bytes.len() as u64;

        if let Some(existing) = entry.buffer.as_ref().filter(|_| entry.size == size) {
            self.queue.write_buffer(existing, 0, &bytes);
            return;
        }

        let usage = match entry.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        entry.buffer = Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kiln.buffer"),
            contents: &bytes,
            usage,
        }));
        entry.size = size;

        // bind groups point at the old buffer
        if entry.kind == BufferKind::Uniform {
            self.bind_groups.clear();
        }
    }

    fn bind_buffer_base(&mut self, slot: u32, buffer: BufferHandle) {
        self.uniform_slots.insert(slot, buffer);
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        // recorded draws may still hold the wgpu buffer; dropping our clone is enough
        self.buffers.remove(&buffer);
        self.uniform_slots.retain(|_, b| *b != buffer);
        self.bind_groups.retain(|(_, bound), _| !bound.contains(&buffer));
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle> {
        let program = pipeline::compile_program(&self.device, source)
            .with_context(|| format!("compiling program '{}'", source.label))?;
        let handle = ProgramHandle(self.next_handle());
        self.programs.insert(handle, program);
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.pipelines.retain(|key, _| key.program != program);
        self.bind_groups.retain(|(p, _), _| *p != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    // ── geometry ──────────────────────────────────────────────────────────

    fn create_vertex_array(
        &mut self,
        format: &VertexFormat,
        vertices: BufferHandle,
        indices: BufferHandle,
    ) -> VertexArrayHandle {
        let handle = VertexArrayHandle(self.next_handle());
        self.vertex_arrays.insert(
            handle,
            VertexArrayBinding {
                format: format.clone(),
                vertices,
                indices,
            },
        );
        handle
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.current_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array);
        if self.current_vertex_array == Some(vertex_array) {
            self.current_vertex_array = None;
        }
    }

    fn draw_elements(&mut self, primitive: Primitive, first_index: u32, count: u32, base_vertex: i32) {
        if count == 0 {
            return;
        }
        if self.state.alpha_to_coverage && !self.warned_alpha_to_coverage {
            log::warn!("alpha to coverage needs a multisampled target; ignored");
            self.warned_alpha_to_coverage = true;
        }

        match self.record_draw(primitive, first_index, count, base_vertex) {
            Ok(draw) => self.draws.push(draw),
            Err(e) => {
                if !self.warned_incomplete_draw {
                    log::warn!("draw skipped: {e:#}");
                    self.warned_incomplete_draw = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_origin_flips_to_top_left() {
        let rect = viewport_rect(Viewport::new(0, 0, 400, 300), (800, 600));
        assert_eq!(rect, Some([0.0, 300.0, 400.0, 300.0]));
    }

    #[test]
    fn invalid_viewport_covers_target() {
        let rect = viewport_rect(Viewport::default(), (640, 480));
        assert_eq!(rect, Some([0.0, 0.0, 640.0, 480.0]));
    }

    #[test]
    fn viewport_is_clipped_to_target() {
        let rect = viewport_rect(Viewport::new(-100, 500, 300, 200), (800, 600));
        assert_eq!(rect, Some([0.0, 0.0, 200.0, 100.0]));
    }

    #[test]
    fn viewport_outside_target_is_dropped() {
        assert_eq!(viewport_rect(Viewport::new(900, 0, 100, 100), (800, 600)), None);
    }
}
