use crate::gfx::api::gl;

/// Depth comparison function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DepthFn {
    Never,
    #[default]
    Less,
    Equal,
    LEqual,
    Greater,
    NotEqual,
    GEqual,
    Always,
}

impl DepthFn {
    pub const ALL: [DepthFn; 8] = [
        DepthFn::Never,
        DepthFn::Less,
        DepthFn::Equal,
        DepthFn::LEqual,
        DepthFn::Greater,
        DepthFn::NotEqual,
        DepthFn::GEqual,
        DepthFn::Always,
    ];

    pub fn to_native(self) -> u32 {
        match self {
            DepthFn::Never => gl::NEVER,
            DepthFn::Less => gl::LESS,
            DepthFn::Equal => gl::EQUAL,
            DepthFn::LEqual => gl::LEQUAL,
            DepthFn::Greater => gl::GREATER,
            DepthFn::NotEqual => gl::NOTEQUAL,
            DepthFn::GEqual => gl::GEQUAL,
            DepthFn::Always => gl::ALWAYS,
        }
    }

    /// Returns `None` for codes outside the comparison-function table.
    pub fn from_native(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.to_native() == code)
    }

    fn index(self) -> u32 {
        self as u32
    }

    fn from_index(i: u32) -> Option<Self> {
        Self::ALL.get(i as usize).copied()
    }
}

/// Blend factor applied to source or destination color.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    DstColor,
    OneMinusDstColor,
    SrcAlphaSaturate,
}

impl BlendFactor {
    pub const ALL: [BlendFactor; 11] = [
        BlendFactor::Zero,
        BlendFactor::One,
        BlendFactor::SrcColor,
        BlendFactor::OneMinusSrcColor,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha,
        BlendFactor::DstColor,
        BlendFactor::OneMinusDstColor,
        BlendFactor::SrcAlphaSaturate,
    ];

    pub fn to_native(self) -> u32 {
        match self {
            BlendFactor::Zero => gl::ZERO,
            BlendFactor::One => gl::ONE,
            BlendFactor::SrcColor => gl::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => gl::ONE_MINUS_SRC_COLOR,
            BlendFactor::SrcAlpha => gl::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstAlpha => gl::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => gl::ONE_MINUS_DST_ALPHA,
            BlendFactor::DstColor => gl::DST_COLOR,
            BlendFactor::OneMinusDstColor => gl::ONE_MINUS_DST_COLOR,
            BlendFactor::SrcAlphaSaturate => gl::SRC_ALPHA_SATURATE,
        }
    }

    pub fn from_native(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.to_native() == code)
    }

    fn index(self) -> u32 {
        self as u32
    }

    fn from_index(i: u32) -> Option<Self> {
        Self::ALL.get(i as usize).copied()
    }
}

/// Source/destination blend factor pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendFn {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFn {
    pub const REPLACE: Self = Self::new(BlendFactor::One, BlendFactor::Zero);
    pub const ALPHA: Self = Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    pub const ADDITIVE: Self = Self::new(BlendFactor::SrcAlpha, BlendFactor::One);

    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }
}

impl Default for BlendFn {
    fn default() -> Self {
        Self::REPLACE
    }
}

// ── hash bit layout ───────────────────────────────────────────────────────

const DEPTH_TEST: u32 = 1 << 0;
const DEPTH_WRITE: u32 = 1 << 1;
const DEPTH_FUNC_SHIFT: u32 = 2;
const DEPTH_FUNC_MASK: u32 = 0b111;
const ALPHA_TEST: u32 = 1 << 5;
const BLEND: u32 = 1 << 6;
const BLEND_SRC_SHIFT: u32 = 7;
const BLEND_DST_SHIFT: u32 = 11;
const BLEND_FACTOR_MASK: u32 = 0b1111;
const CULL_FACE: u32 = 1 << 15;
const POLYGON_OFFSET: u32 = 1 << 16;
const USED_BITS: u32 = (1 << 17) - 1;

/// Complete fixed-function pipeline configuration.
///
/// Defaults mirror a fresh GL context: depth test off, depth write on, `Less`,
/// blending off with `One/Zero`, no culling, no polygon offset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: DepthFn,

    /// Alpha-to-coverage.
    pub alpha_test: bool,

    pub blend: bool,
    pub blend_func: BlendFn,

    /// Back-face culling.
    pub cull_face: bool,
    pub polygon_offset: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: true,
            depth_func: DepthFn::Less,
            alpha_test: false,
            blend: false,
            blend_func: BlendFn::REPLACE,
            cull_face: false,
            polygon_offset: false,
        }
    }
}

impl RenderState {
    /// Packs every field into a distinct bit range.
    ///
    /// Equal hashes imply equal states.
    pub fn hash(&self) -> u32 {
        let mut h = 0;
        if self.depth_test {
            h |= DEPTH_TEST;
        }
        if self.depth_write {
            h |= DEPTH_WRITE;
        }
        h |= self.depth_func.index() << DEPTH_FUNC_SHIFT;
        if self.alpha_test {
            h |= ALPHA_TEST;
        }
        if self.blend {
            h |= BLEND;
        }
        h |= self.blend_func.src.index() << BLEND_SRC_SHIFT;
        h |= self.blend_func.dst.index() << BLEND_DST_SHIFT;
        if self.cull_face {
            h |= CULL_FACE;
        }
        if self.polygon_offset {
            h |= POLYGON_OFFSET;
        }
        h
    }

    /// Inverse of [`hash`](Self::hash). Rejects stray bits and out-of-range enum codes.
    pub fn from_hash(h: u32) -> Option<Self> {
        if h & !USED_BITS != 0 {
            return None;
        }

        Some(Self {
            depth_test: h & DEPTH_TEST != 0,
            depth_write: h & DEPTH_WRITE != 0,
            depth_func: DepthFn::from_index((h >> DEPTH_FUNC_SHIFT) & DEPTH_FUNC_MASK)?,
            alpha_test: h & ALPHA_TEST != 0,
            blend: h & BLEND != 0,
            blend_func: BlendFn {
                src: BlendFactor::from_index((h >> BLEND_SRC_SHIFT) & BLEND_FACTOR_MASK)?,
                dst: BlendFactor::from_index((h >> BLEND_DST_SHIFT) & BLEND_FACTOR_MASK)?,
            },
            cull_face: h & CULL_FACE != 0,
            polygon_offset: h & POLYGON_OFFSET != 0,
        })
    }

    // ── builders ──────────────────────────────────────────────────────────

    /// Depth-tested, depth-written, back-face culled.
    pub fn opaque() -> Self {
        Self {
            depth_test: true,
            cull_face: true,
            ..Self::default()
        }
    }

    pub fn with_depth_test(mut self, on: bool) -> Self {
        self.depth_test = on;
        self
    }

    pub fn with_depth_write(mut self, on: bool) -> Self {
        self.depth_write = on;
        self
    }

    pub fn with_depth_func(mut self, func: DepthFn) -> Self {
        self.depth_func = func;
        self
    }

    pub fn with_blend(mut self, func: BlendFn) -> Self {
        self.blend = true;
        self.blend_func = func;
        self
    }

    pub fn with_cull_face(mut self, on: bool) -> Self {
        self.cull_face = on;
        self
    }

    pub fn with_alpha_test(mut self, on: bool) -> Self {
        self.alpha_test = on;
        self
    }

    pub fn with_polygon_offset(mut self, on: bool) -> Self {
        self.polygon_offset = on;
        self
    }
}
