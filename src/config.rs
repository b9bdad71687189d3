//! Import configuration.
//!
//! Importer settings are name/value pairs ([`PropertyConfig`]) collected in a
//! [`ConfigSet`]. Before each import they are copied into a fresh native
//! property store ([`PropertyStore`]), which is released when the guard
//! drops, on every exit path.

use std::ffi::CString;

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::native::library::AssetLibrary;
use crate::native::types::{AiMatrix4x4, AiPropertyStore, AiString};

/// Names of commonly used importer settings.
pub mod keys {
    /// Max angle (degrees) between faces whose normals are smoothed together.
    pub const GLOBAL_SMOOTH_NORMALS_ANGLE: &str = "PP_GSN_MAX_SMOOTHING_ANGLE";
    /// Max angle (degrees) for tangent smoothing.
    pub const TANGENT_SMOOTHING_ANGLE: &str = "PP_CT_MAX_SMOOTHING_ANGLE";
    pub const SPLIT_VERTEX_LIMIT: &str = "PP_SLM_VERTEX_LIMIT";
    pub const SPLIT_TRIANGLE_LIMIT: &str = "PP_SLM_TRIANGLE_LIMIT";
    pub const MAX_BONE_WEIGHTS: &str = "PP_LBW_MAX_WEIGHTS";
    /// Bit set of components dropped by `REMOVE_COMPONENT`.
    pub const REMOVE_COMPONENT_FLAGS: &str = "PP_RVC_FLAGS";
    /// Bit set of primitive types dropped by `SORT_BY_PRIMITIVE_TYPE`.
    pub const SORT_BY_PRIMITIVE_TYPE_REMOVE: &str = "PP_SBP_REMOVE";
    pub const REMOVE_DEGENERATE_FACES: &str = "PP_FD_REMOVE";
    pub const PRE_TRANSFORM_KEEP_HIERARCHY: &str = "PP_PTV_KEEP_HIERARCHY";
    pub const PRE_TRANSFORM_NORMALIZE: &str = "PP_PTV_NORMALIZE";
    pub const CACHE_LOCALITY_SIZE: &str = "PP_ICL_PTCACHE_SIZE";
    pub const REMOVE_MATERIALS_EXCLUDE_LIST: &str = "PP_RRM_EXCLUDE_LIST";
    pub const OPTIMIZE_GRAPH_EXCLUDE_LIST: &str = "PP_OG_EXCLUDE_LIST";
    pub const MAX_BONES_PER_MESH: &str = "PP_SBBC_MAX_BONES";
    pub const DEBONE_THRESHOLD: &str = "PP_DB_THRESHOLD";
    pub const DEBONE_ALL_OR_NONE: &str = "PP_DB_ALL_OR_NONE";
    pub const GLOBAL_KEYFRAME: &str = "IMPORT_GLOBAL_KEYFRAME";
    pub const NO_SKELETON_MESHES: &str = "IMPORT_NO_SKELETON_MESHES";
    pub const FAVOR_SPEED: &str = "FAVOUR_SPEED";
}

/// One importer setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyConfig {
    Integer(i32),
    Float(f32),
    /// Sent to the native store as integer 0 or 1.
    Boolean(bool),
    String(String),
    Matrix(Mat4),
}

impl PropertyConfig {
    /// Copies this value into `store` under `name`.
    ///
    /// # Safety
    ///
    /// `store` must be a live property store created by `library`.
    unsafe fn apply<L: AssetLibrary + ?Sized>(
        &self,
        library: &L,
        store: *mut AiPropertyStore,
        name: &str,
    ) -> Result<()> {
        let name = CString::new(name)?;
        // SAFETY: live store by the caller's contract; values are copied.
        unsafe {
            match self {
                Self::Integer(v) => library.set_property_integer(store, &name, *v),
                Self::Float(v) => library.set_property_float(store, &name, *v),
                Self::Boolean(v) => library.set_property_integer(store, &name, i32::from(*v)),
                Self::String(v) => library.set_property_string(store, &name, &AiString::new(v)?),
                Self::Matrix(v) => library.set_property_matrix(store, &name, &AiMatrix4x4::from_mat4(v)),
            }
        }
        Ok(())
    }
}

/// Importer settings keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    configs: FxHashMap<String, PropertyConfig>,
}

impl ConfigSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any previous value.
    pub fn set(&mut self, name: &str, value: PropertyConfig) {
        self.configs.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyConfig> {
        self.configs.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyConfig> {
        self.configs.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.configs.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyConfig)> {
        self.configs.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Native property store filled from a [`ConfigSet`], released on drop.
pub struct PropertyStore<'a, L: AssetLibrary + ?Sized> {
    library: &'a L,
    ptr: *mut AiPropertyStore,
}

impl<'a, L: AssetLibrary + ?Sized> PropertyStore<'a, L> {
    /// Creates a native store and copies every setting into it.
    pub fn new(library: &'a L, configs: &ConfigSet) -> Result<Self> {
        let store = Self {
            library,
            ptr: library.create_property_store(),
        };
        if store.ptr.is_null() {
            return Ok(store);
        }
        for (name, value) in configs.iter() {
            // SAFETY: `store.ptr` was just created by `library`; on error the
            // guard releases it.
            unsafe { value.apply(library, store.ptr, name)? };
        }
        log::debug!("Applied {} import settings", configs.len());
        Ok(store)
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut AiPropertyStore {
        self.ptr
    }
}

impl<L: AssetLibrary + ?Sized> Drop for PropertyStore<'_, L> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the store was created by `library` and is released once.
            unsafe { self.library.release_property_store(self.ptr) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_by_name() {
        let mut configs = ConfigSet::new();
        configs.set(keys::MAX_BONE_WEIGHTS, PropertyConfig::Integer(4));
        configs.set(keys::MAX_BONE_WEIGHTS, PropertyConfig::Integer(8));
        configs.set(keys::FAVOR_SPEED, PropertyConfig::Boolean(true));
        assert_eq!(configs.len(), 2);
        assert_eq!(configs.get(keys::MAX_BONE_WEIGHTS), Some(&PropertyConfig::Integer(8)));
        assert!(configs.remove(keys::FAVOR_SPEED).is_some());
        assert!(!configs.contains(keys::FAVOR_SPEED));
    }
}
