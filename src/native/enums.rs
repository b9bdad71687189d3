//! Flags and enumerations that cross the native boundary.
//!
//! Enums are converted from raw native integers with `from_raw`, which maps any
//! value the bridge does not know to a neutral variant instead of failing: a
//! newer native library may report values this crate predates.

use bitflags::bitflags;

bitflags! {
    /// Post-processing steps the native importer runs on a scene.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PostProcessSteps: u32 {
        const CALC_TANGENT_SPACE         = 0x0000_0001;
        const JOIN_IDENTICAL_VERTICES    = 0x0000_0002;
        const MAKE_LEFT_HANDED           = 0x0000_0004;
        const TRIANGULATE                = 0x0000_0008;
        const REMOVE_COMPONENT           = 0x0000_0010;
        const GEN_NORMALS                = 0x0000_0020;
        const GEN_SMOOTH_NORMALS         = 0x0000_0040;
        const SPLIT_LARGE_MESHES         = 0x0000_0080;
        const PRE_TRANSFORM_VERTICES     = 0x0000_0100;
        const LIMIT_BONE_WEIGHTS         = 0x0000_0200;
        const VALIDATE_DATA_STRUCTURE    = 0x0000_0400;
        const IMPROVE_CACHE_LOCALITY     = 0x0000_0800;
        const REMOVE_REDUNDANT_MATERIALS = 0x0000_1000;
        const FIX_INFACING_NORMALS       = 0x0000_2000;
        const SORT_BY_PRIMITIVE_TYPE     = 0x0000_8000;
        const FIND_DEGENERATES           = 0x0001_0000;
        const FIND_INVALID_DATA          = 0x0002_0000;
        const GEN_UV_COORDS              = 0x0004_0000;
        const TRANSFORM_UV_COORDS        = 0x0008_0000;
        const FIND_INSTANCES             = 0x0010_0000;
        const OPTIMIZE_MESHES            = 0x0020_0000;
        const OPTIMIZE_GRAPH             = 0x0040_0000;
        const FLIP_UVS                   = 0x0080_0000;
        const FLIP_WINDING_ORDER         = 0x0100_0000;
        const SPLIT_BY_BONE_COUNT        = 0x0200_0000;
        const DEBONE                     = 0x0400_0000;

        const CONVERT_TO_LEFT_HANDED = Self::MAKE_LEFT_HANDED.bits()
            | Self::FLIP_UVS.bits()
            | Self::FLIP_WINDING_ORDER.bits();
        const TARGET_REALTIME_FAST = Self::CALC_TANGENT_SPACE.bits()
            | Self::GEN_NORMALS.bits()
            | Self::JOIN_IDENTICAL_VERTICES.bits()
            | Self::TRIANGULATE.bits()
            | Self::GEN_UV_COORDS.bits()
            | Self::SORT_BY_PRIMITIVE_TYPE.bits();
    }
}

bitflags! {
    /// Status flags the importer sets on a scene.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SceneFlags: u32 {
        const INCOMPLETE          = 0x01;
        const VALIDATED           = 0x02;
        const VALIDATION_WARNING  = 0x04;
        const NON_VERBOSE_FORMAT  = 0x08;
        const TERRAIN             = 0x10;
    }
}

bitflags! {
    /// Kinds of primitives present in a mesh.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PrimitiveType: u32 {
        const POINT    = 0x1;
        const LINE     = 0x2;
        const TRIANGLE = 0x4;
        const POLYGON  = 0x8;
    }
}

/// Status code returned by native entry points.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Success = 0,
    Failure = -1,
    OutOfMemory = -3,
}

impl ReturnCode {
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            -3 => Self::OutOfMemory,
            _ => Self::Failure,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightSourceType {
    #[default]
    Undefined = 0,
    Directional = 1,
    Point = 2,
    Spot = 3,
}

impl LightSourceType {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Directional,
            2 => Self::Point,
            3 => Self::Spot,
            _ => Self::Undefined,
        }
    }
}

/// Encoding of a material property's raw data.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyType {
    Float = 1,
    Double = 2,
    String = 3,
    Integer = 4,
    #[default]
    Buffer = 5,
}

impl PropertyType {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Float,
            2 => Self::Double,
            3 => Self::String,
            4 => Self::Integer,
            _ => Self::Buffer,
        }
    }
}

/// Texture slot a material property refers to (the property's `semantic`).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    #[default]
    None = 0,
    Diffuse = 1,
    Specular = 2,
    Ambient = 3,
    Emissive = 4,
    Height = 5,
    Normals = 6,
    Shininess = 7,
    Opacity = 8,
    Displacement = 9,
    Lightmap = 10,
    Reflection = 11,
    Unknown = 12,
}

impl TextureType {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Diffuse,
            2 => Self::Specular,
            3 => Self::Ambient,
            4 => Self::Emissive,
            5 => Self::Height,
            6 => Self::Normals,
            7 => Self::Shininess,
            8 => Self::Opacity,
            9 => Self::Displacement,
            10 => Self::Lightmap,
            11 => Self::Reflection,
            _ => Self::Unknown,
        }
    }
}

/// How an animation channel behaves outside its key range.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationBehaviour {
    #[default]
    Default = 0,
    Constant = 1,
    Linear = 2,
    Repeat = 3,
}

impl AnimationBehaviour {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Constant,
            2 => Self::Linear,
            3 => Self::Repeat,
            _ => Self::Default,
        }
    }
}

/// Origin of a native seek request.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Set = 0,
    Current = 1,
    End = 2,
}

impl Origin {
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Set),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }
}
