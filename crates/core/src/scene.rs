//! The fixed scene/instrument vocabulary the generation workflow accepts.
//!
//! Values are lowercase and accent-free because that is what the deployed
//! workflow's inputs expect (the UI may render them differently).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    Teclado,
    Guitarra,
    Bateria,
    Voz,
}

impl Scene {
    /// Workflow input value, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Scene::Teclado => "teclado",
            Scene::Guitarra => "guitarra",
            Scene::Bateria => "bateria",
            Scene::Voz => "voz",
        }
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scene {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teclado" => Ok(Scene::Teclado),
            "guitarra" => Ok(Scene::Guitarra),
            "bateria" => Ok(Scene::Bateria),
            "voz" => Ok(Scene::Voz),
            other => Err(CoreError::Validation(format!(
                "Unknown scene '{other}' (expected teclado, guitarra, bateria, or voz)"
            ))),
        }
    }
}
