use std::ffi::CStr;
use std::ops::{Deref, DerefMut};

use super::{DataFormat, DataType, ImageErrorCode, ImageType};

/// Name of an image inside the library. `0` is the library's default image.
pub type ImageId = u32;

/// Properties of the currently active sub-image.
///
/// The `num_*` counts follow the library's convention of excluding the base
/// image, so a plain image reports zero mipmaps, faces, layers and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: DataFormat,
    pub data_type: DataType,
    pub bytes_per_pixel: u32,
    /// Size of the buffer returned by [`ImageLibrary::data`].
    pub size_of_data: usize,
    pub num_mipmaps: u32,
    pub num_faces: u32,
    pub num_layers: u32,
    pub num_images: u32,
}

/// Function table of a native image library.
///
/// Every method except the id management ones acts on the bound image, and
/// the `active_*` selectors narrow that further to one sub-image. The
/// selectors are relative to the base image of the bound name, so binding
/// resets them.
pub trait ImageLibrary: Send {
    fn gen_image(&mut self) -> ImageId;
    fn bind_image(&mut self, id: ImageId);
    fn bound_image(&self) -> ImageId;
    fn delete_image(&mut self, id: ImageId);

    fn load_file(&mut self, image_type: ImageType, path: &CStr) -> bool;
    fn load_memory(&mut self, image_type: ImageType, data: &[u8]) -> bool;
    fn save_file(&mut self, image_type: ImageType, path: &CStr) -> bool;

    /// Replaces the bound image with `data`, laid out as described.
    fn upload(&mut self, width: u32, height: u32, depth: u32, format: DataFormat, data_type: DataType, data: &[u8])
    -> bool;

    fn info(&self) -> ImageInfo;

    /// Pixel data of the active sub-image, valid for
    /// [`ImageInfo::size_of_data`] bytes until the next call that changes
    /// the binding or the image. Null when nothing is loaded.
    fn data(&self) -> *const u8;

    fn active_image(&mut self, index: u32) -> bool;
    fn active_face(&mut self, index: u32) -> bool;
    fn active_mipmap(&mut self, index: u32) -> bool;
    fn active_layer(&mut self, index: u32) -> bool;

    /// Pops the oldest pending error.
    fn error(&mut self) -> ImageErrorCode;
}

/// Scoped binding of one image.
///
/// Restores whatever was bound before on drop, and deletes the image too when
/// the guard generated it. Dereferences to the library so calls go through
/// the guard while it is alive.
pub struct BoundImage<'a, L: ImageLibrary + ?Sized> {
    library: &'a mut L,
    id: ImageId,
    previous: ImageId,
    owned: bool,
}

impl<'a, L: ImageLibrary + ?Sized> BoundImage<'a, L> {
    /// Binds an existing image for the guard's lifetime.
    pub fn bind(library: &'a mut L, id: ImageId) -> Self {
        let previous = library.bound_image();
        library.bind_image(id);
        Self {
            library,
            id,
            previous,
            owned: false,
        }
    }

    /// Generates a fresh image, binds it, and deletes it on drop.
    pub fn generate(library: &'a mut L) -> Self {
        let previous = library.bound_image();
        let id = library.gen_image();
        library.bind_image(id);
        log::trace!("Generated image {id}");
        Self {
            library,
            id,
            previous,
            owned: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// Rebinds the guarded image, resetting any sub-image selection.
    pub fn rebind(&mut self) {
        self.library.bind_image(self.id);
    }

    /// Drains the pending error, substituting a generic code when the library
    /// failed without reporting one.
    pub fn take_error(&mut self) -> ImageErrorCode {
        match self.library.error() {
            ImageErrorCode::NoError => ImageErrorCode::UnknownError,
            code => code,
        }
    }
}

impl<L: ImageLibrary + ?Sized> Deref for BoundImage<'_, L> {
    type Target = L;

    fn deref(&self) -> &L {
        self.library
    }
}

impl<L: ImageLibrary + ?Sized> DerefMut for BoundImage<'_, L> {
    fn deref_mut(&mut self) -> &mut L {
        self.library
    }
}

impl<L: ImageLibrary + ?Sized> Drop for BoundImage<'_, L> {
    fn drop(&mut self) {
        self.library.bind_image(self.previous);
        if self.owned {
            self.library.delete_image(self.id);
        }
    }
}
