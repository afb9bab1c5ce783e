use graphlens_core::GraphError;
use graphlens_graph::SimulationSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationSettings {
    /// Nodes taken from a freshly loaded result.
    pub initial_node_display: usize,
    /// Neighbours requested per expansion.
    pub max_neighbours: usize,
    pub auto_complete_relationships: bool,
    pub wheel_zoom_requires_modifier: bool,
    pub hover_debounce_ms: u64,
    pub double_click_ms: u64,
    pub drag_tolerance_px: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
    /// Below this zoom scale nodes are drawn without captions.
    pub minify_zoom_threshold: f32,
    pub simulation: SimulationSettings,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        Self {
            initial_node_display: 300,
            max_neighbours: 100,
            auto_complete_relationships: true,
            wheel_zoom_requires_modifier: false,
            hover_debounce_ms: 40,
            double_click_ms: 250,
            drag_tolerance_px: 3.0,
            zoom_min: 0.1,
            zoom_max: 2.0,
            zoom_step: 1.3,
            minify_zoom_threshold: 0.5,
            simulation: SimulationSettings::default(),
        }
    }
}

impl VisualizationSettings {
    /// `<config dir>/graphlens/settings.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("graphlens").join("settings.json"))
    }

    /// Settings from the default location, or defaults when missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::info!("No config directory, using default settings");
            return Self::default();
        };
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!("Settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::error!("Failed to load settings from {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), GraphError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            tracing::warn!("No config directory, settings not saved");
            return;
        };
        if let Err(e) = self.save_to(&path) {
            tracing::error!("Failed to save settings to {:?}: {}", path, e);
        }
    }

    pub fn hover_debounce(&self) -> Duration {
        Duration::from_millis(self.hover_debounce_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = VisualizationSettings::default();
        settings.max_neighbours = 25;
        settings.wheel_zoom_requires_modifier = true;
        settings.simulation.precompute_ticks = 50;
        settings.save_to(&path).unwrap();

        let loaded = VisualizationSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"initial_node_display": 5, "simulation": {"alpha_min": 0.1}}"#)
            .unwrap();

        let loaded = VisualizationSettings::load_from(&path).unwrap();
        assert_eq!(loaded.initial_node_display, 5);
        assert_eq!(loaded.max_neighbours, 100);
        assert_eq!(loaded.simulation.alpha_min, 0.1);
        assert_eq!(loaded.simulation.link_distance, 45.0);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            VisualizationSettings::load_from(&path),
            Err(GraphError::InvalidDocument(_))
        ));
        assert!(matches!(
            VisualizationSettings::load_from(&dir.path().join("missing.json")),
            Err(GraphError::Io(_))
        ));
    }
}
