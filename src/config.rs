use std::path::PathBuf;

/// Everything the viewer needs to know that isn't baked into the scene.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Directory containing the `.glb` assets.
    pub assets_dir: PathBuf,
    /// Base URL of the color service (`GET <base>/get_model/<name>`).
    pub color_service_url: String,
    /// Names offered by the settings panel.
    pub model_options: Vec<String>,
    /// Model requested at startup.
    pub initial_model: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("static/models"),
            color_service_url: "http://127.0.0.1:5000".to_string(),
            model_options: vec!["Bugdroid".to_string()],
            initial_model: "Bugdroid".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_assets_dir_matches_served_layout() {
        let config = ViewerConfig::default();
        assert_eq!(config.assets_dir, PathBuf::from("static/models"));
        assert_eq!(config.initial_model, "Bugdroid");
    }
}
