use std::collections::HashMap;

use anyhow::bail;

use super::{
    BufferHandle, BufferKind, BufferUsage, Capability, ClearMask, DriverInfo, GraphicsApi,
    NativeState, Primitive, ProgramHandle, ProgramSource, StateQuery, VertexArrayHandle,
};
use crate::coords::Viewport;
use crate::gfx::mesh::VertexFormat;

/// One call made against a [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetEnabled(Capability, bool),
    DepthFunc(u32),
    DepthMask(bool),
    BlendFunc(u32, u32),
    Viewport(Viewport),
    ClearColor([f32; 4]),
    Clear(ClearMask),
    CreateBuffer(BufferHandle, BufferKind),
    UploadBuffer { buffer: BufferHandle, len: usize, usage: BufferUsage },
    BindBufferBase(u32, BufferHandle),
    DeleteBuffer(BufferHandle),
    CreateProgram(ProgramHandle, String),
    UseProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(Option<VertexArrayHandle>),
    DeleteVertexArray(VertexArrayHandle),
    DrawElements {
        primitive: Primitive,
        first_index: u32,
        count: u32,
        base_vertex: i32,
    },
}

impl Call {
    /// True for calls that mutate fixed-function pipeline state.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Call::SetEnabled(..) | Call::DepthFunc(_) | Call::DepthMask(_) | Call::BlendFunc(..)
        )
    }
}

/// Headless [`GraphicsApi`] that records every call.
///
/// Keeps a [`NativeState`] shadow so readback behaves like a real driver, and retains
/// uploaded buffer bytes and program sources for inspection.
#[derive(Debug, Default)]
pub struct RecordingApi {
    driver: DriverInfo,
    state: NativeState,
    calls: Vec<Call>,
    next_id: u32,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    programs: HashMap<ProgramHandle, ProgramSource>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(mut self, driver: DriverInfo) -> Self {
        self.driver = driver;
        self
    }

    /// Starts from the given native state instead of the GL defaults.
    pub fn with_state(mut self, state: NativeState) -> Self {
        self.state = state;
        self
    }

    pub fn native_state(&self) -> &NativeState {
        &self.state
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded fixed-function state changes.
    pub fn state_calls(&self) -> usize {
        self.calls.iter().filter(|c| c.is_state_change()).count()
    }

    pub fn draw_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::DrawElements { .. }))
            .count()
    }

    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn program_source(&self, program: ProgramHandle) -> Option<&ProgramSource> {
        self.programs.get(&program)
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsApi for RecordingApi {
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
        self.calls.push(Call::SetEnabled(cap, enabled));
    }

    fn depth_func(&mut self, func: u32) {
        self.state.depth_func = func;
        self.calls.push(Call::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.state.depth_write = write;
        self.calls.push(Call::DepthMask(write));
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.state.blend_src = src;
        self.state.blend_dst = dst;
        self.calls.push(Call::BlendFunc(src, dst));
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.calls.push(Call::Viewport(viewport));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::ClearColor(rgba));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.calls.push(Call::Clear(mask));
    }

    fn create_buffer(&mut self, kind: BufferKind) -> BufferHandle {
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, Vec::new());
        self.calls.push(Call::CreateBuffer(handle, kind));
        handle
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8], usage: BufferUsage) {
        self.buffers.insert(buffer, data.to_vec());
        self.calls.push(Call::UploadBuffer {
            buffer,
            len: data.len(),
            usage,
        });
    }

    fn bind_buffer_base(&mut self, slot: u32, buffer: BufferHandle) {
        self.calls.push(Call::BindBufferBase(slot, buffer));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn create_program(&mut self, source: &ProgramSource) -> anyhow::Result<ProgramHandle> {
        if source.vertex.trim().is_empty() || source.fragment.trim().is_empty() {
            bail!("program '{}' has an empty shader stage", source.label);
        }

        let handle = ProgramHandle(self.next_id());
        self.programs.insert(handle, source.clone());
        self.calls.push(Call::CreateProgram(handle, source.label.clone()));
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(Call::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.calls.push(Call::DeleteProgram(program));
    }

    fn create_vertex_array(
        &mut self,
        _format: &VertexFormat,
        _vertices: BufferHandle,
        _indices: BufferHandle,
    ) -> VertexArrayHandle {
        let handle = VertexArrayHandle(self.next_id());
        self.calls.push(Call::CreateVertexArray(handle));
        handle
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.calls.push(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.calls.push(Call::DeleteVertexArray(vertex_array));
    }

    fn draw_elements(&mut self, primitive: Primitive, first_index: u32, count: u32, base_vertex: i32) {
        self.calls.push(Call::DrawElements {
            primitive,
            first_index,
            count,
            base_vertex,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::gl;

    #[test]
    fn readback_reflects_recorded_state() {
        let mut api = RecordingApi::new();
        api.set_enabled(Capability::Blend, true);
        api.blend_func(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        api.depth_mask(false);

        assert!(api.is_enabled(Capability::Blend));
        assert_eq!(api.get_integer(StateQuery::BlendSrc), gl::SRC_ALPHA);
        assert_eq!(api.get_integer(StateQuery::BlendDst), gl::ONE_MINUS_SRC_ALPHA);
        assert!(!api.depth_write_mask());
        assert_eq!(api.state_calls(), 3);
    }

    #[test]
    fn uploads_keep_latest_bytes() {
        let mut api = RecordingApi::new();
        let buf = api.create_buffer(BufferKind::Uniform);
        api.upload_buffer(buf, &[1, 2, 3, 4], BufferUsage::Dynamic);
        api.upload_buffer(buf, &[5, 6, 7, 8], BufferUsage::Dynamic);

        assert_eq!(api.buffer_data(buf), Some(&[5u8, 6, 7, 8][..]));
        assert_eq!(api.state_calls(), 0);
    }

    #[test]
    fn empty_stage_fails_to_link() {
        let mut api = RecordingApi::new();
        let src = ProgramSource {
            label: "broken".into(),
            vertex: "void main() {}".into(),
            fragment: String::new(),
            blocks: Vec::new(),
        };
        assert!(api.create_program(&src).is_err());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn take_calls_drains_log() {
        let mut api = RecordingApi::new();
        api.clear(ClearMask::COLOR_DEPTH);
        assert_eq!(api.take_calls(), vec![Call::Clear(ClearMask::COLOR_DEPTH)]);
        assert!(api.calls().is_empty());
    }
}
