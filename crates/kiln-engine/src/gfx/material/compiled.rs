use crate::gfx::api::{GraphicsApi, ProgramHandle};
use crate::gfx::param::SharedParamBuffer;
use crate::gfx::state::RenderState;

/// A compiled program, the render state it draws with, and the param buffers it reads.
#[derive(Debug)]
pub struct Material {
    name: String,
    program: ProgramHandle,
    render_state: RenderState,
    render_state_hash: u32,
    params: Vec<SharedParamBuffer>,
}

impl Material {
    pub(crate) fn new(
        name: String,
        program: ProgramHandle,
        render_state: RenderState,
        params: Vec<SharedParamBuffer>,
    ) -> Self {
        Self {
            name,
            program,
            render_state_hash: render_state.hash(),
            render_state,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// Cached [`RenderState::hash`] of [`render_state`](Self::render_state).
    pub fn render_state_hash(&self) -> u32 {
        self.render_state_hash
    }

    /// Param buffers referenced by the material's shaders.
    pub fn params(&self) -> &[SharedParamBuffer] {
        &self.params
    }

    /// Uploads every attached buffer with pending changes. Returns the upload count.
    pub fn sync_params(&self, api: &mut dyn GraphicsApi) -> usize {
        self.params
            .iter()
            .filter(|buf| buf.borrow_mut().sync_if_dirty(api))
            .count()
    }
}
