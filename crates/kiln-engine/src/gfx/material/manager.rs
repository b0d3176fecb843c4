use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, bail};

use crate::gfx::api::{BlockBinding, GraphicsApi, ProgramSource};
use crate::gfx::param::{ParamBuffer, ParamError, ParamRegistry, SharedParamBuffer};
use crate::gfx::shader::{ShaderPreprocessor, UsedBlock};
use crate::gfx::state::RenderState;

use super::compiled::Material;

/// Everything needed to build a [`Material`].
#[derive(Debug, Clone, Copy)]
pub struct MaterialDesc<'s> {
    pub name: &'s str,
    pub vertex: &'s str,
    pub fragment: &'s str,
    pub render_state: RenderState,
}

/// Owns the param buffer registry and every material built against it.
#[derive(Debug, Default)]
pub struct MaterialManager {
    params: ParamRegistry,
    materials: HashMap<String, Rc<Material>>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a param buffer, making it available to `#use`.
    pub fn add_param_buffer(&mut self, buffer: ParamBuffer) -> Result<SharedParamBuffer, ParamError> {
        self.params.register(buffer)
    }

    pub fn param_buffer(&self, name: &str) -> Option<&SharedParamBuffer> {
        self.params.get(name)
    }

    pub fn registry(&self) -> &ParamRegistry {
        &self.params
    }

    pub fn material(&self, name: &str) -> Option<&Rc<Material>> {
        self.materials.get(name)
    }

    pub fn materials(&self) -> impl Iterator<Item = &Rc<Material>> {
        self.materials.values()
    }

    /// Preprocesses and compiles both stages, then attaches the `#use`d buffers.
    pub fn create_material(
        &mut self,
        api: &mut dyn GraphicsApi,
        desc: MaterialDesc<'_>,
    ) -> anyhow::Result<Rc<Material>> {
        if self.materials.contains_key(desc.name) {
            bail!("material '{}' already exists", desc.name);
        }

        let (vertex, fragment) = {
            let pre = ShaderPreprocessor::new(&self.params, api.driver());
            let vertex = pre
                .preprocess(desc.vertex)
                .with_context(|| format!("preprocessing vertex shader of material '{}'", desc.name))?;
            let fragment = pre
                .preprocess(desc.fragment)
                .with_context(|| format!("preprocessing fragment shader of material '{}'", desc.name))?;
            (vertex, fragment)
        };

        let mut used: Vec<UsedBlock> = vertex.blocks;
        for block in fragment.blocks {
            if !used.iter().any(|b| b.buffer == block.buffer) {
                used.push(block);
            }
        }

        let mut blocks = Vec::with_capacity(used.len());
        let mut params = Vec::with_capacity(used.len());
        for block in &used {
            let shared = self
                .params
                .get(&block.buffer)
                .with_context(|| format!("param buffer '{}' vanished", block.buffer))?;
            blocks.push(BlockBinding {
                block: block.block_name.clone(),
                slot: shared.borrow().slot(),
            });
            params.push(Rc::clone(shared));
        }

        let source = ProgramSource {
            label: desc.name.to_string(),
            vertex: vertex.text,
            fragment: fragment.text,
            blocks,
        };
        let program = api
            .create_program(&source)
            .with_context(|| format!("compiling material '{}'", desc.name))?;

        log::debug!(
            "material '{}': program {:?}, {} param buffers",
            desc.name,
            program,
            params.len()
        );

        let material = Rc::new(Material::new(desc.name.to_string(), program, desc.render_state, params));
        self.materials.insert(desc.name.to_string(), Rc::clone(&material));
        Ok(material)
    }

    /// Deletes every program and param buffer. Materials become unusable.
    pub fn release(&mut self, api: &mut dyn GraphicsApi) {
        for (_, material) in self.materials.drain() {
            api.delete_program(material.program());
        }
        self.params.release(api);
    }
}
