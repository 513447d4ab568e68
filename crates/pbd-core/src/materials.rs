use serde::{Deserialize, Serialize};

/// How two material values are merged at a contact. When the particle and the
/// collider disagree, the mode later in this list wins.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialCombineMode {
    Average = 0,
    Minimum = 1,
    Multiply = 2,
    Maximum = 3,
}

impl MaterialCombineMode {
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            MaterialCombineMode::Average => (a + b) * 0.5,
            MaterialCombineMode::Minimum => a.min(b),
            MaterialCombineMode::Multiply => a * b,
            MaterialCombineMode::Maximum => a.max(b),
        }
    }
}

/// Surface response of a particle or collider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionMaterial {
    /// Coulomb friction coefficient. Also sets the static friction threshold.
    pub friction: f32,
    /// Adhesion strength in `[0, 1]`.
    pub stickiness: f32,
    /// Distance from the surface within which adhesion acts.
    pub stick_distance: f32,
    pub friction_combine: MaterialCombineMode,
    pub stickiness_combine: MaterialCombineMode,
}

impl Default for CollisionMaterial {
    fn default() -> Self {
        Self {
            friction: 0.0,
            stickiness: 0.0,
            stick_distance: 0.0,
            friction_combine: MaterialCombineMode::Average,
            stickiness_combine: MaterialCombineMode::Average,
        }
    }
}

impl CollisionMaterial {
    /// Merge two materials into the values used at their contact.
    pub fn combine(&self, other: &CollisionMaterial) -> CombinedMaterial {
        let friction_mode = self.friction_combine.max(other.friction_combine);
        let stick_mode = self.stickiness_combine.max(other.stickiness_combine);
        CombinedMaterial {
            friction: friction_mode.combine(self.friction, other.friction),
            stickiness: stick_mode.combine(self.stickiness, other.stickiness),
            stick_distance: stick_mode.combine(self.stick_distance, other.stick_distance),
        }
    }
}

/// Material values in effect at one contact.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CombinedMaterial {
    pub friction: f32,
    pub stickiness: f32,
    pub stick_distance: f32,
}

/// Fluid behavior of fluid-phase particles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluidMaterial {
    pub smoothing_radius: f32,
    /// Constraint force mixing term of the density constraint (epsilon).
    pub relaxation_factor: f32,
    pub rest_density: f32,
    pub viscosity: f32,
    pub vorticity: f32,
    /// Scales gravity on fluid particles; negative values make them rise.
    pub buoyancy: f32,
}

impl FluidMaterial {
    /// Water: medium density, low viscosity, moderate vorticity.
    pub const WATER: Self = Self {
        smoothing_radius: 0.1,
        relaxation_factor: 600.0,
        rest_density: 1000.0,
        viscosity: 0.01,
        vorticity: 0.1,
        buoyancy: 1.0,
    };

    /// Gas/Smoke: very low density, very low viscosity, high vorticity.
    pub const GAS: Self = Self {
        smoothing_radius: 0.16,
        relaxation_factor: 600.0,
        rest_density: 10.0,
        viscosity: 0.005,
        vorticity: 0.3,
        buoyancy: -0.2,
    };

    /// Honey: high density, high viscosity, low vorticity.
    pub const HONEY: Self = Self {
        smoothing_radius: 0.08,
        relaxation_factor: 600.0,
        rest_density: 1400.0,
        viscosity: 0.5,
        vorticity: 0.02,
        buoyancy: 1.0,
    };
}

impl Default for FluidMaterial {
    fn default() -> Self {
        Self::WATER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluid_presets_valid() {
        for (name, preset) in [
            ("water", FluidMaterial::WATER),
            ("gas", FluidMaterial::GAS),
            ("honey", FluidMaterial::HONEY),
        ] {
            assert!(preset.rest_density > 0.0, "{} density must be positive", name);
            assert!(preset.viscosity >= 0.0, "{} viscosity must be non-negative", name);
            assert!(preset.smoothing_radius > 0.0, "{} radius must be positive", name);
            assert!(preset.relaxation_factor > 0.0, "{} relaxation must be positive", name);
        }
    }

    #[test]
    fn test_combine_mode_priority() {
        let ice = CollisionMaterial {
            friction: 0.1,
            friction_combine: MaterialCombineMode::Minimum,
            ..Default::default()
        };
        let rubber = CollisionMaterial {
            friction: 0.9,
            friction_combine: MaterialCombineMode::Maximum,
            ..Default::default()
        };
        // Maximum outranks Minimum regardless of argument order.
        assert_eq!(ice.combine(&rubber).friction, 0.9);
        assert_eq!(rubber.combine(&ice).friction, 0.9);

        let plain = CollisionMaterial {
            friction: 0.5,
            ..Default::default()
        };
        assert!((plain.combine(&CollisionMaterial::default()).friction - 0.25).abs() < 1e-6);
    }
}
