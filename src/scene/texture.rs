//! Textures embedded in the imported file.

use crate::errors::{BridgeError, Result};
use crate::marshal::{Marshalable, native_count};
use crate::memory::{self, ArrayKind, alloc};
use crate::native::types::{AiTexture, TEXTURE_FORMAT_HINT_LENGTH};

pub use crate::native::types::AiTexel as Texel;

/// An embedded texture, either still encoded (e.g. PNG bytes) or decoded
/// into ARGB8888 texels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedTexture {
    Compressed {
        /// File extension hint such as `"png"`, at most three characters
        format_hint: String,
        data: Vec<u8>,
    },
    Uncompressed {
        width: u32,
        height: u32,
        /// Row-major, `width * height` texels
        texels: Vec<Texel>,
    },
}

impl Default for EmbeddedTexture {
    fn default() -> Self {
        Self::Compressed {
            format_hint: String::new(),
            data: Vec::new(),
        }
    }
}

impl EmbeddedTexture {
    #[inline]
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

fn encode_format_hint(hint: &str) -> Result<[u8; TEXTURE_FORMAT_HINT_LENGTH]> {
    let bytes = hint.as_bytes();
    if bytes.len() >= TEXTURE_FORMAT_HINT_LENGTH {
        return Err(BridgeError::StringTooLong {
            len: bytes.len(),
            max: TEXTURE_FORMAT_HINT_LENGTH - 1,
        });
    }
    let mut out = [0u8; TEXTURE_FORMAT_HINT_LENGTH];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn decode_format_hint(hint: &[u8; TEXTURE_FORMAT_HINT_LENGTH]) -> String {
    let end = hint.iter().position(|&b| b == 0).unwrap_or(hint.len());
    String::from_utf8_lossy(&hint[..end]).into_owned()
}

impl Marshalable for EmbeddedTexture {
    type Native = AiTexture;

    fn write_native(&self, _this_ptr: *mut AiTexture, native: &mut AiTexture) -> Result<()> {
        match self {
            Self::Compressed { format_hint, data } => {
                native.format_hint = encode_format_hint(format_hint)?;
                native.width = native_count(data.len())?;
                native.height = 0;
                native.data = memory::to_native_array_blittable(data).cast();
            }
            Self::Uncompressed { width, height, texels } => {
                let expected = (*width as usize).checked_mul(*height as usize);
                if expected != Some(texels.len()) || *height == 0 {
                    return Err(BridgeError::InvalidArgument(format!(
                        "{} texels do not fill a {width}x{height} texture",
                        texels.len()
                    )));
                }
                native.format_hint = [0; TEXTURE_FORMAT_HINT_LENGTH];
                native.width = *width;
                native.height = *height;
                native.data = memory::to_native_array_blittable(texels);
            }
        }
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiTexture) -> Result<()> {
        *self = if native.height == 0 {
            Self::Compressed {
                format_hint: decode_format_hint(&native.format_hint),
                // SAFETY: a compressed texture stores `width` bytes.
                data: unsafe { memory::marshal_array(native.data.cast(), native.width as usize, ArrayKind::Flat)? },
            }
        } else {
            let count = (native.width as usize)
                .checked_mul(native.height as usize)
                .ok_or(BridgeError::InvalidLength {
                    count: native.width as usize,
                    stride: native.height as usize,
                })?;
            Self::Uncompressed {
                width: native.width,
                height: native.height,
                // SAFETY: an uncompressed texture stores `width * height` texels.
                texels: unsafe { memory::marshal_array(native.data.cast(), count, ArrayKind::Flat)? },
            }
        };
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiTexture) {
        // SAFETY: the texture owns its data block.
        unsafe { alloc::free_memory(native.data) };
    }
}
