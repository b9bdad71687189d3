#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod context;
pub mod errors;
pub mod image;
pub mod io;
pub mod logging;
pub mod marshal;
pub mod memory;
pub mod native;
pub mod scene;

pub use config::{ConfigSet, PropertyConfig, PropertyStore};
pub use context::{AssetContext, ExportDataBlob, ExportFormatDescription};
pub use errors::{BridgeError, Result};
pub use image::{BoundImage, ImageData, ImageErrorCode, ImageExporter, ImageImporter, ImageLibrary};
pub use io::{FileIoSystem, FileMode, IoStream, IoSystem, NativeIoSystem};
pub use logging::LogStream;
pub use marshal::{Marshalable, NativeBox};
pub use memory::{ArrayKind, Blittable};
pub use native::{AssetLibrary, PostProcessSteps, SharedLibrary};
pub use scene::{
    Animation, Camera, EmbeddedTexture, Light, Material, MaterialProperty, Mesh, Node, NodeKey, RootTransform, Scene,
};
