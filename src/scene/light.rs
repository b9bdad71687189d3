use glam::Vec3;

use crate::errors::Result;
use crate::marshal::Marshalable;
use crate::native::enums::LightSourceType;
use crate::native::types::{AiLight, AiString};

/// A light source, positioned relative to the node with the same name.
///
/// Attenuation follows `1 / (constant + linear * d + quadratic * d^2)`.
/// Cone angles only apply to spot lights and are in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub light_type: LightSourceType,
    pub position: Vec3,
    pub direction: Vec3,
    pub attenuation_constant: f32,
    pub attenuation_linear: f32,
    pub attenuation_quadratic: f32,
    pub color_diffuse: Vec3,
    pub color_specular: Vec3,
    pub color_ambient: Vec3,
    pub angle_inner_cone: f32,
    pub angle_outer_cone: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            name: String::new(),
            light_type: LightSourceType::Undefined,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            attenuation_constant: 1.0,
            attenuation_linear: 0.0,
            attenuation_quadratic: 0.0,
            color_diffuse: Vec3::ONE,
            color_specular: Vec3::ONE,
            color_ambient: Vec3::ZERO,
            angle_inner_cone: std::f32::consts::TAU,
            angle_outer_cone: std::f32::consts::TAU,
        }
    }
}

impl Marshalable for Light {
    type Native = AiLight;

    fn write_native(&self, _this_ptr: *mut AiLight, native: &mut AiLight) -> Result<()> {
        native.name = AiString::new(&self.name)?;
        native.light_type = self.light_type as u32;
        native.position = self.position.into();
        native.direction = self.direction.into();
        native.attenuation_constant = self.attenuation_constant;
        native.attenuation_linear = self.attenuation_linear;
        native.attenuation_quadratic = self.attenuation_quadratic;
        native.color_diffuse = self.color_diffuse.into();
        native.color_specular = self.color_specular.into();
        native.color_ambient = self.color_ambient.into();
        native.angle_inner_cone = self.angle_inner_cone;
        native.angle_outer_cone = self.angle_outer_cone;
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiLight) -> Result<()> {
        self.name = native.name.to_string_lossy();
        self.light_type = LightSourceType::from_raw(native.light_type);
        self.position = native.position.into();
        self.direction = native.direction.into();
        self.attenuation_constant = native.attenuation_constant;
        self.attenuation_linear = native.attenuation_linear;
        self.attenuation_quadratic = native.attenuation_quadratic;
        self.color_diffuse = native.color_diffuse.into();
        self.color_specular = native.color_specular.into();
        self.color_ambient = native.color_ambient.into();
        self.angle_inner_cone = native.angle_inner_cone;
        self.angle_outer_cone = native.angle_outer_cone;
        Ok(())
    }

    unsafe fn free_native_contents(_native: &AiLight) {}
}
