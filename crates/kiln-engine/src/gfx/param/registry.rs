use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::gfx::api::GraphicsApi;

use super::buffer::ParamBuffer;
use super::error::ParamError;

/// Param buffer shared between the registry and the materials that use it.
pub type SharedParamBuffer = Rc<RefCell<ParamBuffer>>;

/// Name → param buffer table. Binding slots follow registration order.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    buffers: Vec<SharedParamBuffer>,
    by_name: HashMap<String, usize>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mut buffer: ParamBuffer) -> Result<SharedParamBuffer, ParamError> {
        if self.by_name.contains_key(buffer.name()) {
            return Err(ParamError::DuplicateBuffer {
                name: buffer.name().to_string(),
            });
        }

        let slot = self.buffers.len();
        buffer.set_slot(slot as u32);
        self.by_name.insert(buffer.name().to_string(), slot);

        let shared = Rc::new(RefCell::new(buffer));
        self.buffers.push(Rc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, name: &str) -> Option<&SharedParamBuffer> {
        self.by_name.get(name).map(|&i| &self.buffers[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedParamBuffer> {
        self.buffers.iter()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Releases every buffer's GPU storage.
    pub fn release(&self, api: &mut dyn GraphicsApi) {
        for buf in &self.buffers {
            buf.borrow_mut().release(api);
        }
    }
}
