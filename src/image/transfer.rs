use std::ffi::{CString, OsStr};
use std::path::Path;

use super::library::{BoundImage, ImageId, ImageLibrary};
use super::{ImageData, ImageFrame, ImageType, Surface};
use crate::errors::{BridgeError, Result};
use crate::memory::from_native_array_blittable;

fn path_to_cstring(path: &Path) -> Result<CString> {
    if path.as_os_str().is_empty() {
        return Err(BridgeError::InvalidArgument("image path is empty".into()));
    }
    Ok(CString::new(path.to_string_lossy().as_bytes())?)
}

fn image_type_for(path: &Path) -> ImageType {
    path.extension()
        .and_then(OsStr::to_str)
        .map_or(ImageType::Unknown, ImageType::from_extension)
}

/// Decodes images through the library into managed [`ImageData`].
///
/// Every native image the importer creates is deleted before the call
/// returns, successful or not, and the caller's binding is restored.
pub struct ImageImporter<'a, L: ImageLibrary + ?Sized> {
    library: &'a mut L,
}

impl<'a, L: ImageLibrary + ?Sized> ImageImporter<'a, L> {
    pub fn new(library: &'a mut L) -> Self {
        Self { library }
    }

    /// Loads a file, guessing the format from its extension.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<ImageData> {
        let path = path.as_ref();
        let c_path = path_to_cstring(path)?;
        if !path.is_file() {
            return Err(BridgeError::FileNotFound(path.to_path_buf()));
        }

        let mut image = BoundImage::generate(&mut *self.library);
        if !image.load_file(image_type_for(path), &c_path) {
            return Err(BridgeError::Image {
                error: image.take_error(),
            });
        }
        log::debug!("Loaded image {}", path.display());
        copy_bound(&mut image)
    }

    /// Decodes an in-memory file.
    pub fn load_memory(&mut self, image_type: ImageType, data: &[u8]) -> Result<ImageData> {
        if data.is_empty() {
            return Err(BridgeError::InvalidArgument("image buffer is empty".into()));
        }
        let mut image = BoundImage::generate(&mut *self.library);
        if !image.load_memory(image_type, data) {
            return Err(BridgeError::Image {
                error: image.take_error(),
            });
        }
        copy_bound(&mut image)
    }

    /// Copies an image that already lives in the library. The image itself
    /// is left untouched.
    pub fn copy_image(&mut self, id: ImageId) -> Result<ImageData> {
        copy_bound(&mut BoundImage::bind(&mut *self.library, id))
    }
}

/// Walks frames, faces and mip levels of the bound image.
///
/// Each loop stops at the first sub-image the library refuses to activate or
/// that has no data, keeping what was read so far.
fn copy_bound<L: ImageLibrary + ?Sized>(image: &mut BoundImage<'_, L>) -> Result<ImageData> {
    image.rebind();
    let num_frames = image.info().num_images + 1;
    let mut data = ImageData::default();

    for frame_index in 0..num_frames {
        if !select(image, frame_index, 0, 0) {
            break;
        }
        let num_faces = image.info().num_faces + 1;
        let mut frame = ImageFrame::default();

        for face in 0..num_faces {
            if !select(image, frame_index, face, 0) {
                break;
            }
            let num_mipmaps = image.info().num_mipmaps + 1;
            let mut chain = Vec::with_capacity(num_mipmaps as usize);
            for level in 0..num_mipmaps {
                if !select(image, frame_index, face, level) {
                    break;
                }
                match read_surface(image)? {
                    Some(surface) => chain.push(surface),
                    None => break,
                }
            }
            if chain.is_empty() {
                break;
            }
            frame.faces.push(chain);
        }

        if !frame.faces.is_empty() {
            data.frames.push(frame);
        }
    }

    log::debug!("Copied {} image frame(s)", data.frames.len());
    Ok(data)
}

fn select<L: ImageLibrary + ?Sized>(image: &mut BoundImage<'_, L>, frame: u32, face: u32, level: u32) -> bool {
    image.rebind();
    image.active_image(frame) && image.active_face(face) && image.active_mipmap(level)
}

fn read_surface<L: ImageLibrary + ?Sized>(image: &BoundImage<'_, L>) -> Result<Option<Surface>> {
    let info = image.info();
    let ptr = image.data();
    if ptr.is_null() || info.size_of_data == 0 {
        return Ok(None);
    }
    let surface = Surface {
        width: info.width,
        height: info.height,
        depth: info.depth,
        format: info.format,
        data_type: info.data_type,
        // SAFETY: the library keeps `size_of_data` bytes at `ptr` while the
        // sub-image stays active.
        data: unsafe { from_native_array_blittable::<u8>(ptr.cast(), info.size_of_data) },
    };
    if surface.data.len() < surface.expected_len() {
        return Err(BridgeError::InvalidLength {
            count: surface.data.len(),
            stride: 1,
        });
    }
    Ok(Some(surface))
}

/// Encodes managed images through the library.
pub struct ImageExporter<'a, L: ImageLibrary + ?Sized> {
    library: &'a mut L,
}

impl<'a, L: ImageLibrary + ?Sized> ImageExporter<'a, L> {
    pub fn new(library: &'a mut L) -> Self {
        Self { library }
    }

    /// Saves the base surface of `image`, picking the format from the
    /// extension of `path`.
    pub fn save_file(&mut self, image: &ImageData, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.save_file_as(image, image_type_for(path), path)
    }

    pub fn save_file_as(&mut self, image: &ImageData, image_type: ImageType, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let surface = image
            .base_surface()
            .ok_or_else(|| BridgeError::InvalidArgument("image has no surfaces".into()))?;
        let c_path = path_to_cstring(path)?;
        if surface.data.len() < surface.expected_len() {
            return Err(BridgeError::InvalidArgument(format!(
                "surface holds {} bytes, {}x{}x{} {:?} needs {}",
                surface.data.len(),
                surface.width,
                surface.height,
                surface.depth.max(1),
                surface.format,
                surface.expected_len()
            )));
        }

        let mut bound = BoundImage::generate(&mut *self.library);
        let uploaded = bound.upload(
            surface.width,
            surface.height,
            surface.depth.max(1),
            surface.format,
            surface.data_type,
            &surface.data,
        );
        if !uploaded || !bound.save_file(image_type, &c_path) {
            let error = bound.take_error();
            log::warn!("Failed to save image {}: {error:?}", path.display());
            return Err(BridgeError::Image { error });
        }
        log::debug!("Saved image {}", path.display());
        Ok(())
    }
}
