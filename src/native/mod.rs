//! The native side of the boundary.
//!
//! - [`types`]: fixed-layout native structs
//! - [`enums`]: flags and enumerations
//! - [`library`]: the asset-import library as a trait, plus the serializing wrapper
//! - `system`: `extern "C"` bindings to the installed library (feature `system`)

pub mod enums;
pub mod library;
#[cfg(feature = "system")]
pub mod system;
pub mod types;

pub use enums::{
    AnimationBehaviour, LightSourceType, Origin, PostProcessSteps, PrimitiveType, PropertyType, ReturnCode, SceneFlags,
    TextureType,
};
pub use library::{AssetLibrary, SharedLibrary};
#[cfg(feature = "system")]
pub use system::SystemLibrary;
