//! Post-load geometry transforms.
//!
//! Steps run in a fixed order: scale, rotate, translate, then recompute
//! bounds. Each step is optional. Payloads without positions are left
//! untouched.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use splat_codec::geometry::{NORMAL, POSITION};

use crate::asset::{Asset, Bounds};

/// A uniform or per-axis scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl Scale {
    #[must_use]
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Scale::Uniform(s) => Vec3::splat(s),
            Scale::PerAxis(s) => Vec3::from_array(s),
        }
    }
}

/// Transform applied to an asset after loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    /// Euler angles in radians, applied X then Y then Z.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    /// Recompute bounds after the other steps.
    pub optimize: bool,
}

impl TransformConfig {
    /// Whether applying this config would change anything.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.scale.is_none() && self.rotation.is_none() && self.position.is_none() && !self.optimize
    }

    /// Apply the transform to an asset in place.
    pub fn apply(&self, asset: &mut Asset) {
        if let Some(scale) = self.scale {
            let scale = scale.to_vec3();
            map_vec3(asset, POSITION, |p| p * scale);
        }

        if let Some([x, y, z]) = self.rotation {
            let rotation = Quat::from_euler(EulerRot::ZYX, z, y, x);
            map_vec3(asset, POSITION, |p| rotation * p);
            map_vec3(asset, NORMAL, |n| rotation * n);
        }

        if let Some(position) = self.position {
            let offset = Vec3::from_array(position);
            map_vec3(asset, POSITION, |p| p + offset);
        }

        if self.optimize {
            asset.bounds = asset.positions().and_then(Bounds::from_positions);
        }
    }
}

fn map_vec3(asset: &mut Asset, name: &str, f: impl Fn(Vec3) -> Vec3) {
    let Some(values) = asset.payload.vec3_attribute_mut(name) else {
        return;
    };
    for chunk in values.chunks_exact_mut(3) {
        let v = f(Vec3::from_slice(chunk));
        chunk.copy_from_slice(&v.to_array());
    }
}
