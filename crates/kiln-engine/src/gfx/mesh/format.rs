/// Scalar type of a vertex attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttribType {
    F32,
    /// Unsigned byte normalized to `0.0..=1.0`. Supports 1, 2 or 4 components.
    U8Norm,
}

impl AttribType {
    pub fn size(self) -> u32 {
        match self {
            AttribType::F32 => 4,
            AttribType::U8Norm => 1,
        }
    }
}

/// One vertex attribute. Its shader location is its index in the [`VertexFormat`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttrib {
    pub ty: AttribType,
    pub components: u32,
    pub offset: u32,
}

impl VertexAttrib {
    pub fn size(&self) -> u32 {
        self.ty.size() * self.components
    }
}

/// Interleaved vertex layout.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct VertexFormat {
    attribs: Vec<VertexAttrib>,
    stride: u32,
}

impl VertexFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute directly after the previous one.
    pub fn with(mut self, ty: AttribType, components: u32) -> Self {
        let attrib = VertexAttrib {
            ty,
            components,
            offset: self.stride,
        };
        self.stride += attrib.size();
        self.attribs.push(attrib);
        self
    }

    pub fn attribs(&self) -> &[VertexAttrib] {
        &self.attribs
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }
}
