//! Materials as ordered key/value property lists.
//!
//! A [`MaterialProperty`] is addressed by its key plus a texture slot
//! (`semantic`, `texture_index`); non-texture properties use
//! [`TextureType::None`] and index 0. Values, type tags and semantics are kept
//! as raw native codes and decoded on access, so properties the bridge does
//! not understand survive a round trip untouched.

use glam::{Vec3, Vec4};

use crate::errors::Result;
use crate::marshal::{self, Marshalable, native_count};
use crate::memory::{self, ArrayKind, alloc};
use crate::native::enums::{PropertyType, TextureType};
use crate::native::types::{AiMaterial, AiMaterialProperty, AiString};

/// Well-known property keys.
pub mod keys {
    pub const NAME: &str = "?mat.name";
    pub const TWO_SIDED: &str = "$mat.twosided";
    pub const SHADING_MODEL: &str = "$mat.shadingm";
    pub const OPACITY: &str = "$mat.opacity";
    pub const SHININESS: &str = "$mat.shininess";
    pub const SHININESS_STRENGTH: &str = "$mat.shinpercent";
    pub const COLOR_DIFFUSE: &str = "$clr.diffuse";
    pub const COLOR_AMBIENT: &str = "$clr.ambient";
    pub const COLOR_SPECULAR: &str = "$clr.specular";
    pub const COLOR_EMISSIVE: &str = "$clr.emissive";
    pub const TEXTURE_FILE: &str = "$tex.file";
    pub const TEXTURE_BLEND: &str = "$tex.blend";
}

// ============================================================================
// MaterialProperty
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialProperty {
    pub name: String,
    /// Raw encoding tag, decoded by [`MaterialProperty::property_type`]
    pub type_code: u32,
    /// Raw texture semantic, decoded by [`MaterialProperty::texture_type`]
    pub semantic: u32,
    pub texture_index: u32,
    /// Raw value bytes in the native encoding
    pub data: Vec<u8>,
}

impl MaterialProperty {
    #[must_use]
    pub fn from_bytes(name: &str, property_type: PropertyType, data: Vec<u8>) -> Self {
        Self {
            name: name.to_owned(),
            type_code: property_type as u32,
            semantic: TextureType::None as u32,
            texture_index: 0,
            data,
        }
    }

    #[inline]
    #[must_use]
    pub fn property_type(&self) -> PropertyType {
        PropertyType::from_raw(self.type_code)
    }

    #[inline]
    #[must_use]
    pub fn texture_type(&self) -> TextureType {
        TextureType::from_raw(self.semantic)
    }

    /// Whether the property sits in the given texture slot.
    #[inline]
    #[must_use]
    pub fn is_slot(&self, texture_type: TextureType, texture_index: u32) -> bool {
        self.semantic == texture_type as u32 && self.texture_index == texture_index
    }

    #[must_use]
    pub fn float(name: &str, value: f32) -> Self {
        Self::floats(name, &[value])
    }

    #[must_use]
    pub fn floats(name: &str, values: &[f32]) -> Self {
        Self::from_bytes(name, PropertyType::Float, memory::raw::to_byte_array(values))
    }

    #[must_use]
    pub fn integer(name: &str, value: i32) -> Self {
        Self::from_bytes(name, PropertyType::Integer, value.to_ne_bytes().to_vec())
    }

    #[must_use]
    pub fn boolean(name: &str, value: bool) -> Self {
        Self::integer(name, i32::from(value))
    }

    #[must_use]
    pub fn color3(name: &str, value: Vec3) -> Self {
        Self::floats(name, &value.to_array())
    }

    #[must_use]
    pub fn color4(name: &str, value: Vec4) -> Self {
        Self::floats(name, &value.to_array())
    }

    /// String value, stored the way the native library stores strings: a
    /// 32-bit length, the UTF-8 bytes, and a terminating NUL.
    #[must_use]
    pub fn string(name: &str, value: &str) -> Self {
        let bytes = value.as_bytes();
        let mut data = Vec::with_capacity(bytes.len() + 5);
        data.extend_from_slice(&(bytes.len() as u32).to_ne_bytes());
        data.extend_from_slice(bytes);
        data.push(0);
        Self::from_bytes(name, PropertyType::String, data)
    }

    /// Moves the property into a texture slot.
    #[must_use]
    pub fn with_texture_slot(mut self, texture_type: TextureType, texture_index: u32) -> Self {
        self.semantic = texture_type as u32;
        self.texture_index = texture_index;
        self
    }

    /// `name,semantic,index`: unique within a material.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        format!("{},{},{}", self.name, self.semantic, self.texture_index)
    }

    #[must_use]
    pub fn as_floats(&self) -> Option<Vec<f32>> {
        if self.property_type() != PropertyType::Float || self.data.len() % 4 != 0 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        self.as_floats()?.first().copied()
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        if self.property_type() != PropertyType::Integer {
            return None;
        }
        let bytes: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        Some(i32::from_ne_bytes(bytes))
    }

    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        self.as_integer().map(|v| v != 0)
    }

    #[must_use]
    pub fn as_color3(&self) -> Option<Vec3> {
        let v = self.as_floats()?;
        (v.len() >= 3).then(|| Vec3::new(v[0], v[1], v[2]))
    }

    /// RGBA colour; a three-component colour reads with alpha 1.
    #[must_use]
    pub fn as_color4(&self) -> Option<Vec4> {
        let v = self.as_floats()?;
        match v.len() {
            3 => Some(Vec4::new(v[0], v[1], v[2], 1.0)),
            n if n >= 4 => Some(Vec4::new(v[0], v[1], v[2], v[3])),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        if self.property_type() != PropertyType::String {
            return None;
        }
        let header: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        let len = u32::from_ne_bytes(header) as usize;
        let bytes = self.data.get(4..4 + len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl Marshalable for MaterialProperty {
    type Native = AiMaterialProperty;

    fn write_native(&self, _this_ptr: *mut AiMaterialProperty, native: &mut AiMaterialProperty) -> Result<()> {
        native.key = AiString::new(&self.name)?;
        native.semantic = self.semantic;
        native.index = self.texture_index;
        native.property_type = self.type_code;
        native.data_length = native_count(self.data.len())?;
        native.data = memory::to_native_array_blittable(&self.data);
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiMaterialProperty) -> Result<()> {
        self.name = native.key.to_string_lossy();
        self.semantic = native.semantic;
        self.texture_index = native.index;
        self.type_code = native.property_type;
        // SAFETY: `data_length` bytes travel with `data`.
        self.data = unsafe { memory::marshal_array(native.data.cast(), native.data_length as usize, ArrayKind::Flat)? };
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiMaterialProperty) {
        // SAFETY: the property owns its data block.
        unsafe { alloc::free_memory(native.data) };
    }
}

// ============================================================================
// Material
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub properties: Vec<MaterialProperty>,
}

impl Material {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut material = Self::default();
        material.set_name(name);
        material
    }

    /// Adds `property`, replacing any property with the same key and slot.
    pub fn add_property(&mut self, property: MaterialProperty) {
        match self.properties.iter_mut().find(|p| {
            p.name == property.name && p.semantic == property.semantic && p.texture_index == property.texture_index
        }) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    #[must_use]
    pub fn property(&self, name: &str, texture_type: TextureType, texture_index: u32) -> Option<&MaterialProperty> {
        self.properties
            .iter()
            .find(|p| p.name == name && p.is_slot(texture_type, texture_index))
    }

    /// Removes the property with this key and slot. Returns whether one existed.
    pub fn remove_property(&mut self, name: &str, texture_type: TextureType, texture_index: u32) -> bool {
        let before = self.properties.len();
        self.properties
            .retain(|p| !(p.name == name && p.is_slot(texture_type, texture_index)));
        self.properties.len() != before
    }

    fn plain(&self, name: &str) -> Option<&MaterialProperty> {
        self.property(name, TextureType::None, 0)
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.plain(keys::NAME)?.as_string()
    }

    pub fn set_name(&mut self, name: &str) {
        self.add_property(MaterialProperty::string(keys::NAME, name));
    }

    #[must_use]
    pub fn color_diffuse(&self) -> Option<Vec4> {
        self.plain(keys::COLOR_DIFFUSE)?.as_color4()
    }

    #[must_use]
    pub fn color_specular(&self) -> Option<Vec4> {
        self.plain(keys::COLOR_SPECULAR)?.as_color4()
    }

    #[must_use]
    pub fn color_ambient(&self) -> Option<Vec4> {
        self.plain(keys::COLOR_AMBIENT)?.as_color4()
    }

    #[must_use]
    pub fn color_emissive(&self) -> Option<Vec4> {
        self.plain(keys::COLOR_EMISSIVE)?.as_color4()
    }

    #[must_use]
    pub fn opacity(&self) -> Option<f32> {
        self.plain(keys::OPACITY)?.as_float()
    }

    #[must_use]
    pub fn shininess(&self) -> Option<f32> {
        self.plain(keys::SHININESS)?.as_float()
    }

    #[must_use]
    pub fn is_two_sided(&self) -> bool {
        self.plain(keys::TWO_SIDED).and_then(MaterialProperty::as_boolean).unwrap_or(false)
    }

    /// File path of the texture bound to a slot.
    #[must_use]
    pub fn texture_path(&self, texture_type: TextureType, index: u32) -> Option<String> {
        self.property(keys::TEXTURE_FILE, texture_type, index)?.as_string()
    }

    pub fn set_texture_path(&mut self, texture_type: TextureType, index: u32, path: &str) {
        self.add_property(MaterialProperty::string(keys::TEXTURE_FILE, path).with_texture_slot(texture_type, index));
    }

    /// Number of textures bound for `texture_type`.
    #[must_use]
    pub fn texture_count(&self, texture_type: TextureType) -> usize {
        self.properties
            .iter()
            .filter(|p| p.name == keys::TEXTURE_FILE && p.semantic == texture_type as u32)
            .count()
    }
}

impl Marshalable for Material {
    type Native = AiMaterial;

    fn write_native(&self, _this_ptr: *mut AiMaterial, native: &mut AiMaterial) -> Result<()> {
        let count = native_count(self.properties.len())?;
        native.properties = marshal::to_native_array(&self.properties, ArrayKind::Pointers)?.cast();
        native.num_properties = count;
        native.num_allocated = count;
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiMaterial) -> Result<()> {
        // SAFETY: `num_properties` slots travel with the property array.
        self.properties = unsafe {
            marshal::from_native_array(native.properties.cast(), native.num_properties as usize, ArrayKind::Pointers)?
        };
        Ok(())
    }

    unsafe fn free_native_contents(native: &AiMaterial) {
        // SAFETY: the material owns its property array.
        unsafe {
            marshal::free_native_array::<MaterialProperty>(
                native.properties.cast(),
                native.num_properties as usize,
                ArrayKind::Pointers,
            );
        }
    }
}
