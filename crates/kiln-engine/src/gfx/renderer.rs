use std::rc::Rc;

use crate::coords::Viewport;
use crate::gfx::api::{ClearMask, GraphicsApi, ProgramHandle, VertexArrayHandle};
use crate::gfx::material::Material;
use crate::gfx::mesh::{Mesh, RenderAtom, VertexArray};
use crate::gfx::state::{RenderState, RenderStateCache};

/// Explicit rendering context over one [`GraphicsApi`].
///
/// Caches pipeline state and bindings so redundant native calls are never issued.
pub struct Renderer<A: GraphicsApi> {
    api: A,
    state: RenderStateCache,
    viewport: Viewport,
    clear_color: [f32; 4],

    active_material: Option<Rc<Material>>,
    active_program: Option<ProgramHandle>,
    active_vertex_array: Option<VertexArrayHandle>,
}

impl<A: GraphicsApi> Renderer<A> {
    /// Wraps `api`, seeding the state cache from native readback.
    pub fn new(api: A) -> Self {
        let state = RenderStateCache::from_native(&api);
        let d = api.driver();
        log::info!(
            "renderer on {} / {} ({}), legacy glsl: {}",
            d.vendor,
            d.renderer,
            d.backend,
            d.legacy_glsl
        );

        Self {
            api,
            state,
            viewport: Viewport::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            active_material: None,
            active_program: None,
            active_vertex_array: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn into_api(self) -> A {
        self.api
    }

    // ── viewport ──────────────────────────────────────────────────────────

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.api.viewport(viewport);
        self.viewport = viewport;
    }

    // ── render state ──────────────────────────────────────────────────────

    pub fn render_state(&self) -> &RenderState {
        self.state.current()
    }

    /// Applies `state`, returning the number of native calls it took.
    pub fn set_render_state(&mut self, state: &RenderState) -> usize {
        self.state.apply(&mut self.api, state)
    }

    // ── materials ─────────────────────────────────────────────────────────

    pub fn active_material(&self) -> Option<&Rc<Material>> {
        self.active_material.as_ref()
    }

    /// Settles render state, binds the program, then syncs dirty param buffers.
    pub fn set_active_material(&mut self, material: &Rc<Material>) {
        if self
            .active_material
            .as_ref()
            .is_some_and(|m| Rc::ptr_eq(m, material))
        {
            return;
        }

        if material.render_state_hash() != self.state.hash() {
            self.state.apply(&mut self.api, material.render_state());
        }

        let program = material.program();
        if self.active_program != Some(program) {
            self.api.use_program(program);
            self.active_program = Some(program);
        }

        material.sync_params(&mut self.api);
        self.active_material = Some(Rc::clone(material));
    }

    // ── drawing ───────────────────────────────────────────────────────────

    pub fn set_active_vertex_array(&mut self, vertex_array: Option<&VertexArray>) {
        let handle = vertex_array.map(VertexArray::handle);
        if handle == self.active_vertex_array {
            return;
        }
        self.api.bind_vertex_array(handle);
        self.active_vertex_array = handle;
    }

    pub fn draw_mesh(&mut self, mesh: &Mesh) {
        self.set_active_vertex_array(Some(mesh.buffer.as_ref()));
        self.api
            .draw_elements(mesh.primitive, mesh.start_index, mesh.num_indices, mesh.base_vertex);
    }

    pub fn draw_atom(&mut self, atom: &RenderAtom) {
        self.set_active_material(&atom.material);
        self.draw_mesh(&atom.mesh);
    }

    // ── frame ─────────────────────────────────────────────────────────────

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        if rgba == self.clear_color {
            return;
        }
        self.api.clear_color(rgba);
        self.clear_color = rgba;
    }

    /// Clears color and depth.
    ///
    /// The depth write mask is forced on for the clear and put back afterwards, so the
    /// active material's state still holds.
    pub fn clear(&mut self) {
        self.state.force_depth_write(&mut self.api);
        self.api.clear(ClearMask::COLOR_DEPTH);
        self.state.restore_depth_write(&mut self.api);
    }

    /// Forgets cached bindings after the native state was touched behind the renderer's back.
    pub fn reset_bindings(&mut self) {
        self.active_material = None;
        self.active_program = None;
        self.active_vertex_array = None;
        self.state = RenderStateCache::from_native(&self.api);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::{BufferUsage, Call, Capability, Primitive, RecordingApi};
    use crate::gfx::material::{MaterialDesc, MaterialManager};
    use crate::gfx::mesh::{AttribType, MeshStorage, VertexFormat};
    use crate::gfx::param::{ParamBuffer, ParamLayout};
    use crate::gfx::state::BlendFn;

    const VERT: &str = "#version 140\n#use Common\nvoid main() { gl_Position = vec4(Common.Time); }\n";
    const FRAG: &str = "#version 140\nout vec4 c;\nvoid main() { c = vec4(1.0); }\n";

    struct Fixture {
        renderer: Renderer<RecordingApi>,
        materials: MaterialManager,
    }

    fn fixture() -> Fixture {
        let mut api = RecordingApi::new();
        let mut materials = MaterialManager::new();

        let common = ParamLayout::builder().float("Time").float("DeltaTime").build().unwrap();
        materials
            .add_param_buffer(ParamBuffer::new("Common", common, BufferUsage::Dynamic).unwrap())
            .unwrap();

        for (name, state) in [
            ("opaque", RenderState::opaque()),
            ("opaque_twin", RenderState::opaque()),
            ("glass", RenderState::opaque().with_depth_write(false).with_blend(BlendFn::ALPHA)),
        ] {
            materials
                .create_material(
                    &mut api,
                    MaterialDesc {
                        name,
                        vertex: VERT,
                        fragment: FRAG,
                        render_state: state,
                    },
                )
                .unwrap();
        }

        api.clear_calls();
        Fixture {
            renderer: Renderer::new(api),
            materials,
        }
    }

    fn material(f: &Fixture, name: &str) -> Rc<Material> {
        Rc::clone(f.materials.material(name).unwrap())
    }

    // ── material activation ───────────────────────────────────────────────

    #[test]
    fn activation_applies_state_before_syncing_params() {
        let mut f = fixture();
        let opaque = material(&f, "opaque");

        f.renderer.set_active_material(&opaque);
        let calls = f.renderer.api().calls();

        let last_state = calls.iter().rposition(Call::is_state_change).unwrap();
        let program = calls.iter().position(|c| matches!(c, Call::UseProgram(_))).unwrap();
        let upload = calls
            .iter()
            .position(|c| matches!(c, Call::UploadBuffer { .. }))
            .unwrap();

        assert!(last_state < program);
        assert!(program < upload);
        assert_eq!(f.renderer.render_state(), &RenderState::opaque());
    }

    #[test]
    fn reactivating_same_material_is_free() {
        let mut f = fixture();
        let opaque = material(&f, "opaque");

        f.renderer.set_active_material(&opaque);
        f.renderer.api_mut().clear_calls();

        f.renderer.set_active_material(&opaque);
        assert!(f.renderer.api().calls().is_empty());
    }

    #[test]
    fn same_state_material_skips_state_calls() {
        let mut f = fixture();
        let opaque = material(&f, "opaque");
        let twin = material(&f, "opaque_twin");

        f.renderer.set_active_material(&opaque);
        f.renderer.api_mut().clear_calls();

        f.renderer.set_active_material(&twin);
        assert_eq!(f.renderer.api().state_calls(), 0);
        assert_eq!(
            f.renderer.api().calls(),
            &[Call::UseProgram(twin.program())]
        );
    }

    #[test]
    fn switching_to_blended_material_changes_only_differences() {
        let mut f = fixture();
        let opaque = material(&f, "opaque");
        let glass = material(&f, "glass");

        f.renderer.set_active_material(&opaque);
        f.renderer.api_mut().clear_calls();

        f.renderer.set_active_material(&glass);
        // depth mask, blend toggle, blend func
        assert_eq!(f.renderer.api().state_calls(), 3);
        assert!(f.renderer.api().is_enabled(Capability::Blend));
    }

    // ── draws ─────────────────────────────────────────────────────────────

    #[test]
    fn shared_vertex_array_is_bound_once() {
        let mut f = fixture();
        let format = VertexFormat::new().with(AttribType::F32, 2);
        let mut storage = MeshStorage::new();
        storage
            .push(&format, &[[0.0f32; 2]; 3], &[0, 1, 2], Primitive::Triangles)
            .unwrap();
        storage
            .push(&format, &[[1.0f32; 2]; 3], &[0, 1, 2], Primitive::Triangles)
            .unwrap();
        let meshes = storage.upload(f.renderer.api_mut(), BufferUsage::Static).unwrap();
        f.renderer.api_mut().clear_calls();

        let opaque = material(&f, "opaque");
        for mesh in &meshes {
            f.renderer.draw_atom(&RenderAtom {
                mesh: mesh.clone(),
                material: Rc::clone(&opaque),
            });
        }

        let api = f.renderer.api();
        let binds = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::BindVertexArray(_)))
            .count();
        assert_eq!(binds, 1);
        assert_eq!(api.draw_calls(), 2);
        assert_eq!(
            api.calls().last(),
            Some(&Call::DrawElements {
                primitive: Primitive::Triangles,
                first_index: 3,
                count: 3,
                base_vertex: 3,
            })
        );
    }

    // ── frame ─────────────────────────────────────────────────────────────

    #[test]
    fn clear_forces_depth_write() {
        let mut f = fixture();
        let glass = material(&f, "glass");
        f.renderer.set_active_material(&glass);
        f.renderer.api_mut().clear_calls();

        f.renderer.clear();
        assert_eq!(
            f.renderer.api().calls(),
            &[
                Call::DepthMask(true),
                Call::Clear(ClearMask::COLOR_DEPTH),
                Call::DepthMask(false),
            ]
        );
        assert!(!f.renderer.render_state().depth_write);
        assert!(!f.renderer.api().native_state().depth_write);
    }

    #[test]
    fn clear_keeps_active_material_depth_write() {
        let mut f = fixture();
        let glass = material(&f, "glass");

        f.renderer.clear();
        f.renderer.set_active_material(&glass);
        f.renderer.clear();
        f.renderer.set_active_material(&glass);

        assert!(!f.renderer.render_state().depth_write);
        assert!(!f.renderer.api().native_state().depth_write);
    }

    #[test]
    fn clear_with_depth_write_on_touches_only_clear() {
        let mut f = fixture();
        f.renderer.api_mut().clear_calls();

        f.renderer.clear();
        assert_eq!(f.renderer.api().calls(), &[Call::Clear(ClearMask::COLOR_DEPTH)]);
    }

    #[test]
    fn unchanged_viewport_is_skipped() {
        let mut f = fixture();
        let vp = Viewport::new(0, 0, 1024, 768);
        f.renderer.set_viewport(vp);
        f.renderer.set_viewport(vp);
        assert_eq!(f.renderer.api().calls(), &[Call::Viewport(vp)]);
    }

    #[test]
    fn reset_bindings_forces_rebind() {
        let mut f = fixture();
        let opaque = material(&f, "opaque");
        f.renderer.set_active_material(&opaque);
        f.renderer.reset_bindings();
        f.renderer.api_mut().clear_calls();

        f.renderer.set_active_material(&opaque);
        assert!(
            f.renderer
                .api()
                .calls()
                .contains(&Call::UseProgram(opaque.program()))
        );
        // native state was already right, so nothing else changes
        assert_eq!(f.renderer.api().state_calls(), 0);
    }
}
