use crate::animation::{clips_from_gltf, AnimationMixer};
use crate::camera::Camera;
use crate::color::Rgba;
use crate::config::ViewerConfig;
use crate::controls::OrbitControls;
use crate::loader::{LoadedAsset, LoaderEvent, ModelLoader};
use crate::scene_graph::scene::Scene;
use crate::stats::FrameStats;
use crate::ui::panel::SettingsPanel;

/// The viewer session: everything the frame driver and the loader touch,
/// owned in one place and handed around explicitly.
pub struct Viewer {
    pub config: ViewerConfig,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub scene: Scene,
    pub mixer: Option<AnimationMixer>,
    pub loader: ModelLoader,
    pub stats: FrameStats,
    /// Built after the first model finishes loading.
    pub panel: Option<SettingsPanel>,
    pub current_model: String,
}

impl Viewer {
    /// Creates the session and kicks off the initial model load.
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let camera = Camera::initial();
        let controls = OrbitControls::new(camera.eye, camera.target);
        let mut loader = ModelLoader::new(&config)?;

        let current_model = config.initial_model.clone();
        loader.request(&current_model);

        Ok(Self {
            config,
            camera,
            controls,
            scene: Scene::new(),
            mixer: None,
            loader,
            stats: FrameStats::new(),
            panel: None,
            current_model,
        })
    }

    pub fn request_model(&mut self, name: &str) {
        self.current_model = name.to_string();
        self.loader.request(name);
    }

    /// Applies completed loader work. Called once per frame, before the
    /// renderer syncs models.
    pub fn pump_loader(&mut self) {
        for event in self.loader.drain() {
            match event {
                LoaderEvent::AssetLoaded(asset) => self.apply_loaded_asset(asset),
                LoaderEvent::AssetFailed { name, error, .. } => {
                    log::error!("Failed to load {}: {}", name, error);
                }
                LoaderEvent::ColorResolved { name, color, .. } => {
                    self.apply_color(&name, color);
                }
            }
        }
    }

    fn apply_loaded_asset(&mut self, asset: LoadedAsset) {
        log::info!("Removing {}", asset.name);
        self.scene.remove_object_by_name(&asset.name);
        self.mixer = None;

        let Some(gltf_scene) = asset.document.scenes().next() else {
            log::error!("No scenes in asset for {}", asset.name);
            return;
        };

        match self
            .scene
            .spawn_gltf_scene(&asset.buffers, &gltf_scene, &asset.name)
        {
            Ok((_root, node_map)) => {
                log::info!("Adding {}", asset.name);

                let mut clips = clips_from_gltf(&asset.document, &asset.buffers, &node_map);
                if !clips.is_empty() {
                    log::info!("Adding {} animations.", clips.len());
                    // Only the first clip plays, looping.
                    self.mixer = Some(AnimationMixer::new(clips.remove(0)));
                }

                self.loader.request_color(&asset.name, asset.generation);

                if self.panel.is_none() {
                    log::info!("Creating settings panel");
                    self.panel = Some(SettingsPanel::new(
                        self.config.model_options.clone(),
                        &asset.name,
                    ));
                }
            }
            Err(error) => log::error!("Failed to spawn {}: {}", asset.name, error),
        }
    }

    fn apply_color(&mut self, name: &str, color: Rgba) {
        match self.scene.get_object_by_name(name) {
            Some(root) => self.scene.set_subtree_color(root, color),
            // The model was swapped out while the lookup was in flight.
            None => log::warn!("Dropping color for absent model {}", name),
        }
    }

    /// Per-frame bookkeeping short of the draw itself: damping, the
    /// animation mixer, world transforms, stats.
    pub fn advance(&mut self, dt: f32) {
        self.controls.update(&mut self.camera);

        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(dt, &mut self.scene);
        }

        self.scene.update_world_transforms();
        self.stats.record(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_for_absent_model_is_dropped() {
        let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
        // Nothing is in the scene yet; this must not panic or insert.
        viewer.apply_color("Bugdroid", Rgba::WHITE);
        assert!(viewer.scene.get_object_by_name("Bugdroid").is_none());
    }

    #[test]
    fn request_model_tracks_current_name() {
        let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
        let generation = viewer.loader.current_generation();
        viewer.request_model("Robo Dog");
        assert_eq!(viewer.current_model, "Robo Dog");
        assert_eq!(viewer.loader.current_generation(), generation + 1);
    }

    #[test]
    fn advance_without_model_still_runs() {
        let mut viewer = Viewer::new(ViewerConfig::default()).unwrap();
        viewer.advance(1.0 / 60.0);
        assert!(viewer.stats.fps() > 0.0);
    }
}
