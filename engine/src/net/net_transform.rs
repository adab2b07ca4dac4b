use dawn_shared::{
    math::{Quat, Vec3},
    NetRole, RepLayout, RepProperty, Replicate, SceneManager, System,
};

use crate::net::CNetData;

/// Replicated placement and motion of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct CNetTransform {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl CNetTransform {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Moves the transform forward by `dt` seconds of its own motion
    pub fn integrate(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        let spin = self.angular_velocity * dt;
        let angle = spin.length();
        if angle > 0.0 {
            let step = Quat::from_axis_angle(spin * (1.0 / angle), angle);
            self.orientation = (step * self.orientation).normalized();
        }
    }
}

impl Default for CNetTransform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

impl Replicate for CNetTransform {
    fn rep_layout() -> RepLayout {
        RepLayout::new()
            .with_property(RepProperty::bind::<CNetTransform, Vec3>(
                "position",
                |t| &t.position,
                |t| &mut t.position,
            ))
            .with_property(RepProperty::bind::<CNetTransform, Quat>(
                "orientation",
                |t| &t.orientation,
                |t| &mut t.orientation,
            ))
            .with_property(RepProperty::bind::<CNetTransform, Vec3>(
                "velocity",
                |t| &t.velocity,
                |t| &mut t.velocity,
            ))
            .with_property(RepProperty::bind::<CNetTransform, Vec3>(
                "angular_velocity",
                |t| &t.angular_velocity,
                |t| &mut t.angular_velocity,
            ))
    }
}

/// Integrates the motion of every transform this participant has
/// authority over. Proxies only move when the server says so.
pub struct TransformIntegrator;

impl System for TransformIntegrator {
    fn update(&mut self, scene: &mut SceneManager, dt: f32) {
        for entity in scene.iter_mut() {
            let role = entity.component::<CNetData>().map(CNetData::role);
            if !NetRole::has_authority(role) {
                continue;
            }
            if let Some(transform) = entity.component_mut::<CNetTransform>() {
                transform.integrate(dt);
            }
        }
    }
}
