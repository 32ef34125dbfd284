//! Camera: projection/view state plus the frustum derived from it each frame.

use std::borrow::Cow;

use glam::{Affine3A, Mat4, Vec3A};

use crate::geometry::Frustum;

/// Stack-allocated snapshot of a camera's render-relevant state (POD): what
/// C3/C4/C5 actually read each frame, decoupled from the `Camera` scene node
/// that owns it.
#[derive(Debug, Clone)]
pub struct RenderCamera {
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_projection_matrix: Mat4,
    pub prev_view_projection_matrix: Mat4,
    pub position: Vec3A,
    pub frustum: Frustum,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: Cow<'static, str>,

    pub projection_type: ProjectionType,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub ortho_size: f32,

    pub(crate) world_matrix: Affine3A,
    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
    pub(crate) view_projection_matrix: Mat4,
    /// The previous frame's view-projection matrix, used by C5's motion
    /// vector pass to distinguish camera motion from object motion.
    pub(crate) prev_view_projection_matrix: Mat4,
    pub(crate) frustum: Frustum,
}

impl Camera {
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32) -> Self {
        let mut cam = Self {
            name: Cow::Borrowed("Camera"),
            projection_type: ProjectionType::Perspective,
            fov: fov.to_radians(),
            aspect,
            near,
            far: f32::INFINITY,
            ortho_size: 10.0,

            world_matrix: Affine3A::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            prev_view_projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };

        cam.update_projection_matrix();
        cam
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection_type {
            // Infinite reverse-Z: better depth precision distribution, and
            // the reason `Frustum` has no far plane to extract.
            ProjectionType::Perspective => Mat4::perspective_infinite_reverse_rh(self.fov, self.aspect, self.near),
            ProjectionType::Orthographic => {
                let w = self.ortho_size * self.aspect;
                let h = self.ortho_size;
                Mat4::orthographic_rh(-w, w, -h, h, self.far, self.near)
            }
        };

        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);
    }

    /// Updates view/view-projection/frustum from a world transform, carrying
    /// the prior frame's view-projection matrix forward for motion vectors.
    pub fn update_view_projection(&mut self, world_transform: &Affine3A) {
        self.prev_view_projection_matrix = self.view_projection_matrix;
        self.world_matrix = *world_transform;

        self.view_matrix = Mat4::from(*world_transform).inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);
    }

    #[must_use]
    pub fn extract_render_camera(&self) -> RenderCamera {
        RenderCamera {
            view_matrix: self.view_matrix,
            projection_matrix: self.projection_matrix,
            view_projection_matrix: self.view_projection_matrix,
            prev_view_projection_matrix: self.prev_view_projection_matrix,
            position: self.world_matrix.translation,
            frustum: self.frustum.clone(),
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn update_view_projection_carries_previous_matrix_forward() {
        let mut cam = Camera::new_perspective(60.0, 16.0 / 9.0, 0.1);
        let first = cam.view_projection_matrix;
        cam.update_view_projection(&Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(cam.prev_view_projection_matrix, first);
        assert_ne!(cam.view_projection_matrix, first);
    }

    #[test]
    fn frustum_updates_with_projection_change() {
        let mut cam = Camera::new_perspective(60.0, 16.0 / 9.0, 0.1);
        let rc = cam.extract_render_camera();
        assert!(rc.frustum.intersects_sphere(Vec3::ZERO, 0.5));
    }
}
