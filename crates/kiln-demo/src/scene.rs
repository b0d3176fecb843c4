use anyhow::{Context, Result};
use glam::{Vec3, Vec4};

use kiln_engine::gfx::Renderer;
use kiln_engine::gfx::api::{BufferUsage, GraphicsApi, Primitive};
use kiln_engine::gfx::material::{MaterialDesc, MaterialManager};
use kiln_engine::gfx::mesh::{MeshStorage, RenderAtom};
use kiln_engine::gfx::param::{ParamBuffer, ParamError, ParamLayout, SharedParamBuffer};
use kiln_engine::gfx::state::{BlendFn, RenderState};

use crate::camera::Camera;
use crate::geometry::{self, Part, Vertex};

const MESH_VERT: &str = include_str!("../shaders/mesh.vert");
const FLAGS_VERT: &str = include_str!("../shaders/flags.vert");
const SKY_VERT: &str = include_str!("../shaders/sky.vert");
const LIT_FRAG: &str = include_str!("../shaders/lit.frag");
const SKY_FRAG: &str = include_str!("../shaders/sky.frag");
const QUASICRYSTAL_FRAG: &str = include_str!("../shaders/quasicrystal.frag");

struct Layer {
    name: &'static str,
    vertex: &'static str,
    fragment: &'static str,
    render_state: RenderState,
    part: Part,
}

/// Back to front: sky first, additive gates last.
fn layers() -> Vec<Layer> {
    let opaque = RenderState::opaque();
    let see_through = opaque.with_depth_write(false).with_cull_face(false);

    vec![
        Layer {
            name: "sky",
            vertex: SKY_VERT,
            fragment: SKY_FRAG,
            render_state: RenderState::default().with_depth_write(false),
            part: geometry::sky(),
        },
        Layer {
            name: "opaque",
            vertex: MESH_VERT,
            fragment: LIT_FRAG,
            render_state: opaque,
            part: geometry::opaque(),
        },
        Layer {
            name: "flags",
            vertex: FLAGS_VERT,
            fragment: LIT_FRAG,
            render_state: opaque.with_cull_face(false),
            part: geometry::flags(),
        },
        Layer {
            name: "transparent",
            vertex: MESH_VERT,
            fragment: LIT_FRAG,
            render_state: see_through.with_blend(BlendFn::ALPHA),
            part: geometry::transparent(),
        },
        Layer {
            name: "quasicrystal",
            vertex: MESH_VERT,
            fragment: QUASICRYSTAL_FRAG,
            render_state: see_through.with_blend(BlendFn::ADDITIVE),
            part: geometry::gates(),
        },
    ]
}

fn sun_layout() -> Result<ParamLayout, ParamError> {
    ParamLayout::builder()
        .vec3("Direction")
        .vec4("Color")
        .vec4("ShadowColor")
        .float("Brightness")
        .build()
}

fn common_layout() -> Result<ParamLayout, ParamError> {
    ParamLayout::builder().float("Time").float("DeltaTime").build()
}

/// The arena: param buffers, materials and one packed mesh storage.
pub struct Scene {
    materials: MaterialManager,
    atoms: Vec<RenderAtom>,
    common: SharedParamBuffer,
    camera: SharedParamBuffer,
}

impl Scene {
    pub fn load(api: &mut dyn GraphicsApi) -> Result<Self> {
        let mut materials = MaterialManager::new();

        let sun = materials.add_param_buffer(ParamBuffer::new("Sun", sun_layout()?, BufferUsage::Static)?)?;
        {
            let mut sun = sun.borrow_mut();
            sun.set("Direction", Vec3::new(-1.0, -1.0, 1.0).normalize())?;
            sun.set("Color", Vec4::new(1.0, 0.9, 0.7, 1.0))?;
            sun.set("ShadowColor", Vec4::new(0.5, 0.5, 0.5, 1.0))?;
            sun.set("Brightness", 3.0f32)?;
        }
        let common =
            materials.add_param_buffer(ParamBuffer::new("Common", common_layout()?, BufferUsage::Dynamic)?)?;
        let camera =
            materials.add_param_buffer(ParamBuffer::new("Camera", Camera::param_layout()?, BufferUsage::Dynamic)?)?;

        let layers = layers();

        let mut storage = MeshStorage::new();
        for layer in &layers {
            storage
                .push(&Vertex::format(), &layer.part.vertices, &layer.part.indices, Primitive::Triangles)
                .with_context(|| format!("packing '{}' geometry", layer.name))?;
        }
        let meshes = storage
            .upload(api, BufferUsage::Static)
            .context("uploading arena geometry")?;

        let mut atoms = Vec::with_capacity(layers.len());
        for (layer, mesh) in layers.into_iter().zip(meshes) {
            let material = materials.create_material(
                api,
                MaterialDesc {
                    name: layer.name,
                    vertex: layer.vertex,
                    fragment: layer.fragment,
                    render_state: layer.render_state,
                },
            )?;
            atoms.push(RenderAtom { mesh, material });
        }

        Ok(Self {
            materials,
            atoms,
            common,
            camera,
        })
    }

    /// Draw list, in draw order.
    pub fn atoms(&self) -> &[RenderAtom] {
        &self.atoms
    }

    /// Refreshes the per-frame param buffers. They upload on the next material switch.
    pub fn update(&self, elapsed: f32, dt: f32, camera: &Camera) -> Result<(), ParamError> {
        {
            let mut common = self.common.borrow_mut();
            common.set("Time", elapsed)?;
            common.set("DeltaTime", dt)?;
        }
        camera.write(&mut self.camera.borrow_mut())
    }

    pub fn render<A: GraphicsApi>(&self, renderer: &mut Renderer<A>) {
        renderer.clear();
        for atom in &self.atoms {
            renderer.draw_atom(atom);
        }
    }

    /// Deletes every GPU object the scene created.
    pub fn release(&mut self, api: &mut dyn GraphicsApi) {
        if let Some(atom) = self.atoms.first() {
            atom.mesh.buffer.release(api);
        }
        self.atoms.clear();
        self.materials.release(api);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_engine::gfx::api::{Call, RecordingApi};

    #[test]
    fn load_builds_five_materials_over_one_vertex_array() {
        let mut api = RecordingApi::new();
        let scene = Scene::load(&mut api).unwrap();

        let names: Vec<_> = scene.atoms().iter().map(|a| a.material.name()).collect();
        assert_eq!(names, ["sky", "opaque", "flags", "transparent", "quasicrystal"]);

        let arrays = api
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateVertexArray(_)))
            .count();
        assert_eq!(arrays, 1);
    }

    #[test]
    fn use_directives_are_expanded_in_compiled_sources() {
        let mut api = RecordingApi::new();
        let scene = Scene::load(&mut api).unwrap();

        let flags = &scene.atoms()[2].material;
        let source = api.program_source(flags.program()).unwrap();
        assert!(source.vertex.contains("uniform CameraLayout"));
        assert!(source.vertex.contains("Common_Time"));
        assert!(!source.vertex.contains("#use"));
        assert!(source.fragment.contains("uniform SunLayout"));

        let blocks: Vec<_> = source.blocks.iter().map(|b| b.block.as_str()).collect();
        assert_eq!(blocks, ["CameraLayout", "CommonLayout", "SunLayout"]);
    }

    #[test]
    fn render_clears_then_draws_every_atom() {
        let mut api = RecordingApi::new();
        let scene = Scene::load(&mut api).unwrap();
        api.clear_calls();

        let mut renderer = Renderer::new(api);
        scene.update(1.0, 0.016, &Camera::default()).unwrap();
        scene.render(&mut renderer);

        let calls = renderer.api().calls();
        let clear = calls.iter().position(|c| matches!(c, Call::Clear(_))).unwrap();
        let first_draw = calls
            .iter()
            .position(|c| matches!(c, Call::DrawElements { .. }))
            .unwrap();
        assert!(clear < first_draw);
        assert_eq!(renderer.api().draw_calls(), 5);
    }
}
