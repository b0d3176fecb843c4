use glam::{Mat4, Vec3};
use kiln_engine::gfx::param::{ParamBuffer, ParamError, ParamLayout};

/// Perspective camera that yaws around the world up axis.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    /// Radians, counter-clockwise seen from above. Zero looks down -Z.
    pub yaw: f32,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            yaw: 0.0,
            fov_y: 60f32.to_radians(),
            aspect: 4.0 / 3.0,
            z_near: 1.0,
            z_far: 3000.0,
        }
    }
}

impl Camera {
    /// `Camera` param buffer layout.
    pub fn param_layout() -> Result<ParamLayout, ParamError> {
        ParamLayout::builder()
            .mat4("View")
            .mat4("Projection")
            .mat4("ViewProjection")
            .vec3("Position")
            .build()
    }

    pub fn view(&self) -> Mat4 {
        (Mat4::from_translation(self.eye) * Mat4::from_rotation_y(self.yaw)).inverse()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Writes all matrices into a buffer laid out by [`Camera::param_layout`].
    pub fn write(&self, buffer: &mut ParamBuffer) -> Result<(), ParamError> {
        let view = self.view();
        let projection = self.projection();
        buffer.set("View", view)?;
        buffer.set("Projection", projection)?;
        buffer.set("ViewProjection", projection * view)?;
        buffer.set("Position", self.eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_engine::gfx::api::BufferUsage;
    use kiln_engine::gfx::param::ParamValue;

    #[test]
    fn yaw_turns_the_forward_axis() {
        let camera = Camera {
            eye: Vec3::new(0.0, 10.0, 0.0),
            yaw: std::f32::consts::FRAC_PI_2,
            ..Camera::default()
        };
        // a quarter turn left looks down -X
        let ahead = camera.view().transform_point3(Vec3::new(-5.0, 10.0, 0.0));
        assert!((ahead - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-4);
    }

    #[test]
    fn write_fills_every_member() {
        let mut buffer =
            ParamBuffer::new("Camera", Camera::param_layout().unwrap(), BufferUsage::Dynamic).unwrap();
        let camera = Camera {
            eye: Vec3::new(1.0, 2.0, 3.0),
            ..Camera::default()
        };
        camera.write(&mut buffer).unwrap();

        assert_eq!(buffer.get("Position").unwrap(), ParamValue::Vec3(camera.eye));
        assert_eq!(
            buffer.get("ViewProjection").unwrap(),
            ParamValue::Mat4(camera.projection() * camera.view())
        );
        assert!(buffer.is_dirty());
    }

    #[test]
    fn zero_height_keeps_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport_size(800, 0);
        assert_eq!(camera.aspect, 4.0 / 3.0);
        camera.set_viewport_size(800, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
