//! Image library interface.
//!
//! The native image library keeps a global "currently bound image": every
//! query and upload acts on whatever was bound last. This module wraps that
//! context:
//!
//! - [`ImageLibrary`]: the native function table as a trait
//! - [`BoundImage`]: scoped binding that restores the previous image on drop
//! - [`ImageImporter`] / [`ImageExporter`]: copy images between the native
//!   library and managed [`ImageData`]

mod library;
mod transfer;

pub use library::{BoundImage, ImageId, ImageInfo, ImageLibrary};
pub use transfer::{ImageExporter, ImageImporter};

/// Error codes reported by the image library.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageErrorCode {
    #[default]
    NoError = 0x0000,
    InvalidEnum = 0x0501,
    OutOfMemory = 0x0502,
    FormatNotSupported = 0x0503,
    InternalError = 0x0504,
    InvalidValue = 0x0505,
    IllegalOperation = 0x0506,
    IllegalFileValue = 0x0507,
    InvalidFileHeader = 0x0508,
    InvalidParameter = 0x0509,
    CouldNotOpenFile = 0x050A,
    InvalidExtension = 0x050B,
    FileAlreadyExists = 0x050C,
    OutFormatSame = 0x050D,
    StackOverflow = 0x050E,
    StackUnderflow = 0x050F,
    InvalidConversion = 0x0510,
    BadDimensions = 0x0511,
    /// Read and write failures share one code.
    FileIoError = 0x0512,
    GifError = 0x05E1,
    JpegError = 0x05E2,
    PngError = 0x05E3,
    TiffError = 0x05E4,
    MngError = 0x05E5,
    Jp2Error = 0x05E6,
    ExrError = 0x05E7,
    UnknownError = 0x05FF,
}

impl ImageErrorCode {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0x0000 => Self::NoError,
            0x0501 => Self::InvalidEnum,
            0x0502 => Self::OutOfMemory,
            0x0503 => Self::FormatNotSupported,
            0x0504 => Self::InternalError,
            0x0505 => Self::InvalidValue,
            0x0506 => Self::IllegalOperation,
            0x0507 => Self::IllegalFileValue,
            0x0508 => Self::InvalidFileHeader,
            0x0509 => Self::InvalidParameter,
            0x050A => Self::CouldNotOpenFile,
            0x050B => Self::InvalidExtension,
            0x050C => Self::FileAlreadyExists,
            0x050D => Self::OutFormatSame,
            0x050E => Self::StackOverflow,
            0x050F => Self::StackUnderflow,
            0x0510 => Self::InvalidConversion,
            0x0511 => Self::BadDimensions,
            0x0512 => Self::FileIoError,
            0x05E1 => Self::GifError,
            0x05E2 => Self::JpegError,
            0x05E3 => Self::PngError,
            0x05E4 => Self::TiffError,
            0x05E5 => Self::MngError,
            0x05E6 => Self::Jp2Error,
            0x05E7 => Self::ExrError,
            _ => Self::UnknownError,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_error(self) -> bool {
        self != Self::NoError
    }
}

/// Pixel layout of image data.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    ColorIndex = 0x1900,
    Alpha = 0x1906,
    Rgb = 0x1907,
    #[default]
    Rgba = 0x1908,
    Bgr = 0x80E0,
    Bgra = 0x80E1,
    Luminance = 0x1909,
    LuminanceAlpha = 0x190A,
}

impl DataFormat {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0x1900 => Self::ColorIndex,
            0x1906 => Self::Alpha,
            0x1907 => Self::Rgb,
            0x80E0 => Self::Bgr,
            0x80E1 => Self::Bgra,
            0x1909 => Self::Luminance,
            0x190A => Self::LuminanceAlpha,
            _ => Self::Rgba,
        }
    }

    #[must_use]
    pub fn channels(self) -> u32 {
        match self {
            Self::ColorIndex | Self::Alpha | Self::Luminance => 1,
            Self::LuminanceAlpha => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }
}

/// Component type of image data.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    Byte = 0x1400,
    #[default]
    UnsignedByte = 0x1401,
    Short = 0x1402,
    UnsignedShort = 0x1403,
    Int = 0x1404,
    UnsignedInt = 0x1405,
    Float = 0x1406,
    Double = 0x140A,
    Half = 0x140B,
}

impl DataType {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0x1400 => Self::Byte,
            0x1402 => Self::Short,
            0x1403 => Self::UnsignedShort,
            0x1404 => Self::Int,
            0x1405 => Self::UnsignedInt,
            0x1406 => Self::Float,
            0x140A => Self::Double,
            0x140B => Self::Half,
            _ => Self::UnsignedByte,
        }
    }

    /// Bytes per component.
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort | Self::Half => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// File format of an encoded image. `Unknown` lets the library guess.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    #[default]
    Unknown = 0x0000,
    Bmp = 0x0420,
    Ico = 0x0424,
    Jpg = 0x0425,
    Pcx = 0x0428,
    Png = 0x042A,
    Pnm = 0x042B,
    Sgi = 0x042C,
    Tga = 0x042D,
    Tiff = 0x042E,
    Raw = 0x0430,
    Gif = 0x0436,
    Dds = 0x0437,
    Psd = 0x0439,
    Hdr = 0x043F,
    Jp2 = 0x0441,
    Exr = 0x0442,
}

impl ImageType {
    /// Guesses the format from a file extension, case-insensitively.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "bmp" => Self::Bmp,
            "ico" => Self::Ico,
            "jpg" | "jpeg" | "jpe" | "jif" | "jfif" => Self::Jpg,
            "pcx" => Self::Pcx,
            "png" => Self::Png,
            "pbm" | "pgm" | "pnm" | "ppm" => Self::Pnm,
            "sgi" | "bw" | "rgb" | "rgba" => Self::Sgi,
            "tga" | "vda" | "icb" | "vst" => Self::Tga,
            "tif" | "tiff" => Self::Tiff,
            "raw" => Self::Raw,
            "gif" => Self::Gif,
            "dds" => Self::Dds,
            "psd" => Self::Psd,
            "hdr" => Self::Hdr,
            "jp2" => Self::Jp2,
            "exr" => Self::Exr,
            _ => Self::Unknown,
        }
    }
}

/// One decoded surface: a single mip level of a single face.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: DataFormat,
    pub data_type: DataType,
    pub data: Vec<u8>,
}

impl Surface {
    /// Bytes the pixel data should occupy for this size and layout.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.depth.max(1) as usize
            * (self.format.channels() * self.data_type.size()) as usize
    }
}

/// One image of an image array: its faces, each a mip chain with the base
/// level first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageFrame {
    pub faces: Vec<Vec<Surface>>,
}

/// Managed copy of everything the library decoded from one source.
///
/// Holds one frame for plain images, several for animations, and six faces
/// per frame for cube maps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageData {
    pub frames: Vec<ImageFrame>,
}

impl ImageData {
    /// Wraps a single surface.
    #[must_use]
    pub fn from_surface(surface: Surface) -> Self {
        Self {
            frames: vec![ImageFrame {
                faces: vec![vec![surface]],
            }],
        }
    }

    /// Base mip level of the first face of the first frame.
    #[must_use]
    pub fn base_surface(&self) -> Option<&Surface> {
        self.frames.first()?.faces.first()?.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_surface().is_none()
    }

    #[must_use]
    pub fn mip_count(&self) -> usize {
        self.frames.first().and_then(|f| f.faces.first()).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_cube_map(&self) -> bool {
        self.frames.first().is_some_and(|f| f.faces.len() == 6)
    }
}
