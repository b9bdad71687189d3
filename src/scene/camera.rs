use std::f32::consts::FRAC_PI_4;

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::marshal::Marshalable;
use crate::native::types::{AiCamera, AiString};

/// A camera, positioned relative to the node with the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: String,
    pub position: Vec3,
    pub up: Vec3,
    /// Viewing direction, not normalized
    pub direction: Vec3,
    /// Half horizontal field of view, in radians
    pub field_of_view: f32,
    pub clip_plane_near: f32,
    pub clip_plane_far: f32,
    /// Zero when the aspect ratio follows the viewport
    pub aspect_ratio: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            up: Vec3::Y,
            direction: Vec3::Z,
            field_of_view: FRAC_PI_4,
            clip_plane_near: 0.1,
            clip_plane_far: 1000.0,
            aspect_ratio: 0.0,
        }
    }
}

impl Camera {
    /// Right-handed view matrix in the camera's local space.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }
}

impl Marshalable for Camera {
    type Native = AiCamera;

    fn write_native(&self, _this_ptr: *mut AiCamera, native: &mut AiCamera) -> Result<()> {
        native.name = AiString::new(&self.name)?;
        native.position = self.position.into();
        native.up = self.up.into();
        native.look_at = self.direction.into();
        native.horizontal_fov = self.field_of_view;
        native.clip_plane_near = self.clip_plane_near;
        native.clip_plane_far = self.clip_plane_far;
        native.aspect = self.aspect_ratio;
        Ok(())
    }

    unsafe fn read_native(&mut self, native: &AiCamera) -> Result<()> {
        self.name = native.name.to_string_lossy();
        self.position = native.position.into();
        self.up = native.up.into();
        self.direction = native.look_at.into();
        self.field_of_view = native.horizontal_fov;
        self.clip_plane_near = native.clip_plane_near;
        self.clip_plane_far = native.clip_plane_far;
        self.aspect_ratio = native.aspect;
        Ok(())
    }

    unsafe fn free_native_contents(_native: &AiCamera) {}
}
