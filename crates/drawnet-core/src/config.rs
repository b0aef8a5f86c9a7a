//! Document configuration loaded from TOML.
//!
//! The configuration is the single source of default data: the initial
//! drawing, the flow system seeds, and the diff and history settings are
//! all derived from a [`DocumentConfig`] value instead of globals.
//!
//! ```toml
//! [drawing]
//! title = "Level 3 fit-out"
//!
//! [[drawing.levels]]
//! uid = "ground"
//! name = "Ground Floor"
//! abbreviation = "G"
//! floor-height-m = 0.0
//!
//! [diff]
//! float-epsilon = 1e-6
//!
//! [history]
//! max-undo = 100
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drawing::DrawingState;
use crate::entity::{Color, Uid};
use crate::error::{ModelError, Result};
use crate::flow_system::{FlowSystemSpec, FlowSystems, NetworkParams, NetworkType};
use crate::level::Level;
use crate::metadata::{default_available_fixtures, Metadata};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DocumentConfig {
    #[serde(default)]
    pub drawing: DrawingConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// `[drawing]`: the contents of a new document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DrawingConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_levels")]
    pub levels: Vec<LevelConfig>,
    /// Replaces the standard water systems when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_systems: Option<Vec<FlowSystemConfig>>,
    #[serde(default = "default_available_fixtures")]
    pub available_fixtures: Vec<String>,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            levels: default_levels(),
            flow_systems: None,
            available_fixtures: default_available_fixtures(),
        }
    }
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_levels() -> Vec<LevelConfig> {
    vec![LevelConfig {
        uid: "ground".to_string(),
        name: "Ground Floor".to_string(),
        abbreviation: "G".to_string(),
        floor_height_m: 0.0,
    }]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LevelConfig {
    pub uid: Uid,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    #[serde(default)]
    pub floor_height_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlowSystemConfig {
    pub uid: Uid,
    pub name: String,
    pub temperature: f64,
    /// Hex color, e.g. `"#009CE0"`.
    pub color: String,
    #[serde(default = "default_fluid")]
    pub fluid: String,
    #[serde(default)]
    pub has_return_system: bool,
    /// Keyed by network tag: `RISERS`, `RETICULATIONS` or `CONNECTIONS`.
    pub networks: BTreeMap<String, NetworkConfig>,
}

fn default_fluid() -> String {
    "water".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    pub velocity_ms: f64,
    pub material: String,
    #[serde(default = "default_minimum_pipe_size")]
    pub minimum_pipe_size: f64,
    #[serde(default)]
    pub spare_capacity_pct: f64,
}

fn default_minimum_pipe_size() -> f64 {
    15.0
}

/// `[diff]`: differ settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiffConfig {
    /// Numbers closer than this are not reported as changes.
    #[serde(default = "default_float_epsilon")]
    pub float_epsilon: f64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            float_epsilon: default_float_epsilon(),
        }
    }
}

fn default_float_epsilon() -> f64 {
    1e-6
}

/// `[history]`: undo stack settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HistoryConfig {
    /// Maximum undo depth; 0 keeps everything.
    #[serde(default = "default_max_undo")]
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: default_max_undo(),
        }
    }
}

fn default_max_undo() -> usize {
    100
}

impl DocumentConfig {
    /// Parse and validate a TOML configuration.
    pub fn parse(source: &str) -> Result<Self> {
        let config: DocumentConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        log::debug!("loaded document config from {}", path.display());
        Self::parse(&source)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ModelError::Toml(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.drawing.levels.is_empty() {
            return Err(config_error("at least one level is required"));
        }
        let mut level_uids = HashSet::new();
        for level in &self.drawing.levels {
            if !level_uids.insert(level.uid.as_str()) {
                return Err(config_error(format!("duplicate level uid {}", level.uid)));
            }
        }
        if let Some(systems) = &self.drawing.flow_systems {
            let mut system_uids = HashSet::new();
            for system in systems {
                if !system_uids.insert(system.uid.as_str()) {
                    return Err(config_error(format!("duplicate flow system uid {}", system.uid)));
                }
                for tag in system.networks.keys() {
                    if NetworkType::parse(tag).is_none() {
                        return Err(ModelError::UnknownNetwork {
                            system: system.uid.clone(),
                            network: tag.clone(),
                        });
                    }
                }
            }
        }
        if self.diff.float_epsilon.is_nan() || self.diff.float_epsilon < 0.0 {
            return Err(config_error("float-epsilon must be a non-negative number"));
        }
        Ok(())
    }

    fn flow_systems(&self) -> FlowSystems {
        match &self.drawing.flow_systems {
            None => FlowSystems::standard(),
            Some(systems) => FlowSystems::new(
                systems
                    .iter()
                    .map(|s| {
                        let networks = s
                            .networks
                            .iter()
                            .filter_map(|(tag, params)| {
                                NetworkType::parse(tag).map(|network| (network, params))
                            })
                            .map(|(network, params)| {
                                (
                                    network,
                                    NetworkParams {
                                        velocity_ms: params.velocity_ms,
                                        material: params.material.clone(),
                                        minimum_pipe_size: params.minimum_pipe_size,
                                        spare_capacity_pct: params.spare_capacity_pct,
                                    },
                                )
                            })
                            .collect();
                        let mut system = FlowSystemSpec {
                            name: s.name.clone(),
                            temperature: s.temperature,
                            color: Color::new(s.color.clone()),
                            fluid: s.fluid.clone(),
                            networks,
                        }
                        .into_system(s.uid.clone());
                        system.has_return_system = s.has_return_system;
                        system
                    })
                    .collect(),
            ),
        }
    }

    /// The snapshot every new document starts from.
    pub fn initial_drawing(&self) -> Result<DrawingState> {
        self.validate()?;
        let mut metadata = Metadata {
            flow_systems: self.flow_systems(),
            available_fixtures: self.drawing.available_fixtures.clone(),
            ..Metadata::default()
        };
        metadata.general_info.title = self.drawing.title.clone();

        let mut state = DrawingState::new(metadata);
        for level in &self.drawing.levels {
            state.levels.insert(
                level.uid.clone(),
                Level::new(
                    level.uid.clone(),
                    level.name.clone(),
                    level.abbreviation.clone(),
                    level.floor_height_m,
                ),
            );
        }
        Ok(state)
    }
}

fn config_error(detail: impl Into<String>) -> ModelError {
    ModelError::Config {
        detail: detail.into(),
    }
}
