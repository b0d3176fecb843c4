use glam::{DMat4, DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

/// Shader parameter kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ParamType {
    Float,
    Double,
    Int,
    UInt,
    Vec2,
    DVec2,
    IVec2,
    UVec2,
    Vec3,
    DVec3,
    IVec3,
    UVec3,
    Vec4,
    DVec4,
    IVec4,
    UVec4,
    Mat4,
    DMat4,
}

impl ParamType {
    /// Packed size in bytes.
    pub fn size(self) -> usize {
        use ParamType::*;
        match self {
            Float | Int | UInt => 4,
            Double | Vec2 | IVec2 | UVec2 => 8,
            Vec3 | IVec3 | UVec3 => 12,
            DVec2 | Vec4 | IVec4 | UVec4 => 16,
            DVec3 => 24,
            DVec4 => 32,
            Mat4 => 64,
            DMat4 => 128,
        }
    }

    /// std140 base alignment in bytes.
    pub fn alignment(self) -> usize {
        use ParamType::*;
        match self {
            Float | Int | UInt => 4,
            Double | Vec2 | IVec2 | UVec2 => 8,
            DVec2 | Vec3 | IVec3 | UVec3 | Vec4 | IVec4 | UVec4 | Mat4 => 16,
            DVec3 | DVec4 | DMat4 => 32,
        }
    }

    /// Size rounded up to the alignment.
    pub fn size_aligned(self) -> usize {
        align_up(self.size(), self.alignment())
    }

    /// Type literal used in generated uniform blocks.
    pub fn glsl_name(self) -> &'static str {
        use ParamType::*;
        match self {
            Float => "float",
            Double => "double",
            Int => "int",
            UInt => "uint",
            Vec2 => "vec2",
            DVec2 => "dvec2",
            IVec2 => "ivec2",
            UVec2 => "uvec2",
            Vec3 => "vec3",
            DVec3 => "dvec3",
            IVec3 => "ivec3",
            UVec3 => "uvec3",
            Vec4 => "vec4",
            DVec4 => "dvec4",
            IVec4 => "ivec4",
            UVec4 => "uvec4",
            Mat4 => "mat4",
            DMat4 => "dmat4",
        }
    }
}

pub(crate) fn align_up(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

/// A typed parameter value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Double(f64),
    Int(i32),
    UInt(u32),
    Vec2(Vec2),
    DVec2(DVec2),
    IVec2(IVec2),
    UVec2(UVec2),
    Vec3(Vec3),
    DVec3(DVec3),
    IVec3(IVec3),
    UVec3(UVec3),
    Vec4(Vec4),
    DVec4(DVec4),
    IVec4(IVec4),
    UVec4(UVec4),
    Mat4(Mat4),
    DMat4(DMat4),
}

impl ParamValue {
    pub fn ty(&self) -> ParamType {
        match self {
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Double(_) => ParamType::Double,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::UInt(_) => ParamType::UInt,
            ParamValue::Vec2(_) => ParamType::Vec2,
            ParamValue::DVec2(_) => ParamType::DVec2,
            ParamValue::IVec2(_) => ParamType::IVec2,
            ParamValue::UVec2(_) => ParamType::UVec2,
            ParamValue::Vec3(_) => ParamType::Vec3,
            ParamValue::DVec3(_) => ParamType::DVec3,
            ParamValue::IVec3(_) => ParamType::IVec3,
            ParamValue::UVec3(_) => ParamType::UVec3,
            ParamValue::Vec4(_) => ParamType::Vec4,
            ParamValue::DVec4(_) => ParamType::DVec4,
            ParamValue::IVec4(_) => ParamType::IVec4,
            ParamValue::UVec4(_) => ParamType::UVec4,
            ParamValue::Mat4(_) => ParamType::Mat4,
            ParamValue::DMat4(_) => ParamType::DMat4,
        }
    }

    /// Packed native-endian bytes; matrices are column-major.
    pub fn bytes(&self) -> &[u8] {
        use bytemuck::bytes_of;
        match self {
            ParamValue::Float(v) => bytes_of(v),
            ParamValue::Double(v) => bytes_of(v),
            ParamValue::Int(v) => bytes_of(v),
            ParamValue::UInt(v) => bytes_of(v),
            ParamValue::Vec2(v) => bytes_of(v),
            ParamValue::DVec2(v) => bytes_of(v),
            ParamValue::IVec2(v) => bytes_of(v),
            ParamValue::UVec2(v) => bytes_of(v),
            ParamValue::Vec3(v) => bytes_of(v),
            ParamValue::DVec3(v) => bytes_of(v),
            ParamValue::IVec3(v) => bytes_of(v),
            ParamValue::UVec3(v) => bytes_of(v),
            ParamValue::Vec4(v) => bytes_of(v),
            ParamValue::DVec4(v) => bytes_of(v),
            ParamValue::IVec4(v) => bytes_of(v),
            ParamValue::UVec4(v) => bytes_of(v),
            ParamValue::Mat4(v) => bytes_of(v),
            ParamValue::DMat4(v) => bytes_of(v),
        }
    }

    /// Decodes a value of kind `ty` from the start of `bytes`.
    ///
    /// `bytes` must hold at least `ty.size()` bytes.
    pub(crate) fn read(ty: ParamType, bytes: &[u8]) -> Self {
        use bytemuck::pod_read_unaligned as r;
        let b = &bytes[..ty.size()];
        match ty {
            ParamType::Float => ParamValue::Float(r(b)),
            ParamType::Double => ParamValue::Double(r(b)),
            ParamType::Int => ParamValue::Int(r(b)),
            ParamType::UInt => ParamValue::UInt(r(b)),
            ParamType::Vec2 => ParamValue::Vec2(r(b)),
            ParamType::DVec2 => ParamValue::DVec2(r(b)),
            ParamType::IVec2 => ParamValue::IVec2(r(b)),
            ParamType::UVec2 => ParamValue::UVec2(r(b)),
            ParamType::Vec3 => ParamValue::Vec3(r(b)),
            ParamType::DVec3 => ParamValue::DVec3(r(b)),
            ParamType::IVec3 => ParamValue::IVec3(r(b)),
            ParamType::UVec3 => ParamValue::UVec3(r(b)),
            ParamType::Vec4 => ParamValue::Vec4(r(b)),
            ParamType::DVec4 => ParamValue::DVec4(r(b)),
            ParamType::IVec4 => ParamValue::IVec4(r(b)),
            ParamType::UVec4 => ParamValue::UVec4(r(b)),
            ParamType::Mat4 => ParamValue::Mat4(r(b)),
            ParamType::DMat4 => ParamValue::DMat4(r(b)),
        }
    }
}

macro_rules! impl_from_value {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for ParamValue {
                fn from(v: $t) -> Self {
                    ParamValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    f32 => Float,
    f64 => Double,
    i32 => Int,
    u32 => UInt,
    Vec2 => Vec2,
    DVec2 => DVec2,
    IVec2 => IVec2,
    UVec2 => UVec2,
    Vec3 => Vec3,
    DVec3 => DVec3,
    IVec3 => IVec3,
    UVec3 => UVec3,
    Vec4 => Vec4,
    DVec4 => DVec4,
    IVec4 => IVec4,
    UVec4 => UVec4,
    Mat4 => Mat4,
    DMat4 => DMat4,
}
