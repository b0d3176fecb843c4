use std::collections::HashMap;

use super::error::{ParamError, check_identifier};
use super::types::{ParamType, align_up};

/// One declared parameter with its std140 byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ParamType,
    pub offset: usize,
}

/// Ordered parameter declarations with std140 offsets, computed once at build time.
#[derive(Debug, Clone, Default)]
pub struct ParamLayout {
    params: Vec<ParamDecl>,
    index: HashMap<String, usize>,
    size: usize,
}

impl ParamLayout {
    pub fn builder() -> ParamLayoutBuilder {
        ParamLayoutBuilder::default()
    }

    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Block size in bytes, a multiple of 16.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn param(&self, index: usize) -> Option<&ParamDecl> {
        self.params.get(index)
    }
}

/// Collects `(name, type)` pairs in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParamLayoutBuilder {
    entries: Vec<(String, ParamType)>,
}

impl ParamLayoutBuilder {
    pub fn add(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.entries.push((name.into(), ty));
        self
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::Float)
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::Int)
    }

    pub fn uint(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::UInt)
    }

    pub fn vec2(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::Vec2)
    }

    pub fn vec3(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::Vec3)
    }

    pub fn vec4(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::Vec4)
    }

    pub fn mat4(self, name: impl Into<String>) -> Self {
        self.add(name, ParamType::Mat4)
    }

    pub fn build(self) -> Result<ParamLayout, ParamError> {
        let mut params = Vec::with_capacity(self.entries.len());
        let mut index = HashMap::with_capacity(self.entries.len());
        let mut cursor = 0;

        for (name, ty) in self.entries {
            check_identifier(&name)?;
            if index.contains_key(&name) {
                return Err(ParamError::DuplicateParam { name });
            }

            let offset = align_up(cursor, ty.alignment());
            cursor = offset + ty.size();

            index.insert(name.clone(), params.len());
            params.push(ParamDecl { name, ty, offset });
        }

        Ok(ParamLayout {
            params,
            index,
            size: align_up(cursor, 16),
        })
    }
}
