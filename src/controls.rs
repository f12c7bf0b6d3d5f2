use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};

use crate::camera::Camera;

const DAMPING_FACTOR: f32 = 0.05;
const MIN_DISTANCE: f32 = 25.0;
const MAX_DISTANCE: f32 = 250.0;
// Slightly above zero so the camera can never align with the up vector.
const MIN_POLAR: f32 = 0.01;
const MAX_POLAR: f32 = FRAC_PI_2;
const ROTATE_SPEED: f32 = 0.005;
const ZOOM_STEP: f32 = 0.95;

/// Damped orbit around a fixed target: left-drag rotates, scroll zooms.
///
/// The commanded orbit (`target_*`) moves immediately with input; the
/// rendered orbit eases toward it a fraction per frame, which is what
/// gives the camera its glide after the pointer stops.
pub struct OrbitControls {
    pub target: Vec3,

    radius: f32,
    azimuth: f32,
    polar: f32,

    target_radius: f32,
    target_azimuth: f32,
    target_polar: f32,

    rotating: bool,
    last_cursor: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let radius = offset.length().max(f32::EPSILON);
        let azimuth = offset.x.atan2(offset.z);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        Self {
            target,
            radius,
            azimuth,
            polar,
            target_radius: radius.clamp(MIN_DISTANCE, MAX_DISTANCE),
            target_azimuth: azimuth,
            target_polar: polar.clamp(MIN_POLAR, MAX_POLAR),
            rotating: false,
            last_cursor: None,
        }
    }

    pub fn set_rotating(&mut self, rotating: bool) {
        self.rotating = rotating;
        if !rotating {
            self.last_cursor = None;
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        if !self.rotating {
            self.last_cursor = None;
            return;
        }

        if let Some(last) = self.last_cursor {
            let delta = position - last;
            self.target_azimuth -= delta.x * ROTATE_SPEED;
            self.target_polar =
                (self.target_polar - delta.y * ROTATE_SPEED).clamp(MIN_POLAR, MAX_POLAR);
        }
        self.last_cursor = Some(position);
    }

    /// Positive `lines` zooms in, negative zooms out.
    pub fn scroll(&mut self, lines: f32) {
        self.target_radius =
            (self.target_radius * ZOOM_STEP.powf(lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Advances damping one frame and writes the resulting eye position.
    pub fn update(&mut self, camera: &mut Camera) {
        self.radius += (self.target_radius - self.radius) * DAMPING_FACTOR;
        self.azimuth += (self.target_azimuth - self.azimuth) * DAMPING_FACTOR;
        self.polar += (self.target_polar - self.polar) * DAMPING_FACTOR;

        let sin_polar = self.polar.sin();
        let offset = Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        );

        camera.eye = self.target + offset;
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls() -> OrbitControls {
        OrbitControls::new(Vec3::new(-5.0, 3.0, 15.0), Vec3::new(0.0, 2.0, 0.0))
    }

    #[test]
    fn damping_converges_to_commanded_orbit() {
        let mut controls = controls();
        let mut camera = Camera::initial();

        controls.set_rotating(true);
        controls.cursor_moved(Vec2::new(0.0, 0.0));
        controls.cursor_moved(Vec2::new(200.0, 0.0));
        controls.set_rotating(false);

        let mut last_azimuth = controls.azimuth;
        for _ in 0..1000 {
            controls.update(&mut camera);
        }
        assert!((controls.azimuth - controls.target_azimuth).abs() < 1e-3);
        assert_ne!(controls.azimuth, last_azimuth);

        // Eye stays on the commanded sphere around the target.
        last_azimuth = controls.azimuth;
        controls.update(&mut camera);
        assert_eq!(controls.azimuth, last_azimuth + (controls.target_azimuth - last_azimuth) * DAMPING_FACTOR);
        let dist = (camera.eye - controls.target).length();
        assert!((dist - controls.target_radius).abs() < 0.5);
    }

    #[test]
    fn radius_clamps_hold() {
        let mut controls = controls();
        controls.scroll(-1000.0);
        assert_eq!(controls.target_radius, MAX_DISTANCE);
        controls.scroll(1000.0);
        assert_eq!(controls.target_radius, MIN_DISTANCE);
    }

    #[test]
    fn polar_never_goes_below_horizon() {
        let mut controls = controls();
        controls.set_rotating(true);
        controls.cursor_moved(Vec2::new(0.0, 0.0));
        // Drag far downward, which pushes the commanded polar angle up.
        controls.cursor_moved(Vec2::new(0.0, -10000.0));
        assert!(controls.target_polar <= MAX_POLAR);
        controls.cursor_moved(Vec2::new(0.0, 10000.0));
        assert!(controls.target_polar >= MIN_POLAR);
    }

    #[test]
    fn cursor_motion_without_button_is_ignored() {
        let mut controls = controls();
        let before = controls.target_azimuth;
        controls.cursor_moved(Vec2::new(0.0, 0.0));
        controls.cursor_moved(Vec2::new(500.0, 500.0));
        assert_eq!(controls.target_azimuth, before);
    }
}
