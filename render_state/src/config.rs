use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::error::RenderStateError;

/// Engine settings that drawing code does not change per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct RenderStateConfig {
    /// Fog formula selector. Its sign in the fog-enable uniform marks black fog.
    #[derivative(Default(value = "1"))]
    pub fog_mode: i32,
    /// Lighting model. Dynamic light color is only uploaded in mode 8.
    #[derivative(Default(value = "3"))]
    pub light_mode: i32,
    /// Upper bound on simultaneously active color attachments.
    #[derivative(Default(value = "3"))]
    pub max_draw_buffers: u32,
    /// Stencil reference value that portal offsets are added to.
    pub stencil_base: i32,
}

impl RenderStateConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, RenderStateError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the settings are usable.
    pub fn validate(&self) -> Result<(), RenderStateError> {
        if self.max_draw_buffers == 0 {
            return Err(RenderStateError::InvalidConfig(
                "max_draw_buffers must be at least 1".to_string(),
            ));
        }
        if self.fog_mode < 0 {
            return Err(RenderStateError::InvalidConfig(format!(
                "fog_mode must not be negative, got {}",
                self.fog_mode
            )));
        }
        Ok(())
    }
}
