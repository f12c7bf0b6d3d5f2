use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

use anyhow::Context;
use serde::Deserialize;

use crate::color::{parse_css_color, Rgba, FALLBACK_COLOR};
use crate::config::ViewerConfig;

/// A parsed asset on its way back to the main thread.
pub struct LoadedAsset {
    pub name: String,
    pub generation: u64,
    pub document: gltf::Document,
    pub buffers: Vec<gltf::buffer::Data>,
}

pub enum LoaderEvent {
    AssetLoaded(LoadedAsset),
    AssetFailed {
        name: String,
        generation: u64,
        error: String,
    },
    ColorResolved {
        name: String,
        generation: u64,
        color: Rgba,
    },
}

impl LoaderEvent {
    fn generation(&self) -> u64 {
        match self {
            LoaderEvent::AssetLoaded(asset) => asset.generation,
            LoaderEvent::AssetFailed { generation, .. } => *generation,
            LoaderEvent::ColorResolved { generation, .. } => *generation,
        }
    }

    fn name(&self) -> &str {
        match self {
            LoaderEvent::AssetLoaded(asset) => &asset.name,
            LoaderEvent::AssetFailed { name, .. } => name,
            LoaderEvent::ColorResolved { name, .. } => name,
        }
    }
}

#[derive(Deserialize)]
struct ColorPayload {
    color: String,
}

/// Background model loading and the remote color lookup.
///
/// Work runs on a small tokio runtime; completions cross back over a
/// channel drained once per frame on the main thread. Every request bumps
/// a generation counter and results stamped with an older generation are
/// discarded on arrival, so overlapping reloads cannot interleave their
/// scene mutations.
pub struct ModelLoader {
    runtime: tokio::runtime::Runtime,
    sender: Sender<LoaderEvent>,
    receiver: Receiver<LoaderEvent>,
    generation: u64,
    assets_dir: PathBuf,
    base_url: String,
    http: reqwest::Client,
}

impl ModelLoader {
    pub fn new(config: &ViewerConfig) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to create loader runtime")?;

        let (sender, receiver) = channel();

        Ok(Self {
            runtime,
            sender,
            receiver,
            generation: 0,
            assets_dir: config.assets_dir.clone(),
            base_url: config.color_service_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Kicks off an asset load and returns its generation token.
    pub fn request(&mut self, name: &str) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let name = name.to_string();
        let path = self.assets_dir.join(asset_file_name(&name));
        let sender = self.sender.clone();

        log::info!("Loading {} from {}", name, path.display());

        self.runtime.spawn_blocking(move || {
            let event = match gltf::import(&path) {
                Ok((document, buffers, _images)) => LoaderEvent::AssetLoaded(LoadedAsset {
                    name,
                    generation,
                    document,
                    buffers,
                }),
                Err(error) => LoaderEvent::AssetFailed {
                    name,
                    generation,
                    error: error.to_string(),
                },
            };
            // The receiver only goes away on shutdown.
            let _ = sender.send(event);
        });

        generation
    }

    /// Fires the color lookup for a freshly inserted model. Failures of
    /// any kind resolve to the fallback color; they never surface.
    pub fn request_color(&self, name: &str, generation: u64) {
        let name = name.to_string();
        let url = format!("{}/get_model/{}", self.base_url, name.replace(' ', "%20"));
        let http = self.http.clone();
        let sender = self.sender.clone();

        self.runtime.spawn(async move {
            let color = fetch_color(&http, &url).await;
            let _ = sender.send(LoaderEvent::ColorResolved {
                name,
                generation,
                color,
            });
        });
    }

    /// Completed work for the current generation, in arrival order.
    /// Stale completions are logged and dropped.
    pub fn drain(&mut self) -> Vec<LoaderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            if event.generation() != self.generation {
                log::warn!(
                    "Discarding stale result for {} (generation {} < {})",
                    event.name(),
                    event.generation(),
                    self.generation
                );
                continue;
            }
            events.push(event);
        }
        events
    }
}

async fn fetch_color(http: &reqwest::Client, url: &str) -> Rgba {
    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(error) => {
            log::warn!("Color lookup failed ({}). Defaulting to black.", error);
            return FALLBACK_COLOR;
        }
    };

    if !response.status().is_success() {
        log::warn!(
            "Color data not found (status {}). Defaulting to black.",
            response.status()
        );
        return FALLBACK_COLOR;
    }

    match response.json::<ColorPayload>().await {
        Ok(payload) => parse_css_color(&payload.color).unwrap_or_else(|| {
            log::warn!("Unparseable color {:?}. Defaulting to black.", payload.color);
            FALLBACK_COLOR
        }),
        Err(error) => {
            log::warn!("Bad color payload ({}). Defaulting to black.", error);
            FALLBACK_COLOR
        }
    }
}

/// `"Bug Droid"` → `"bugdroid.glb"`.
pub fn asset_file_name(model_name: &str) -> String {
    let stem: String = model_name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("{}.glb", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_asset_file_name() {
        assert_eq!(asset_file_name("Bugdroid"), "bugdroid.glb");
        assert_eq!(asset_file_name("Bug Droid"), "bugdroid.glb");
        assert_eq!(asset_file_name("  Robo  Dog "), "robodog.glb");
    }

    #[test]
    fn stale_generations_are_discarded() {
        let mut loader = ModelLoader::new(&ViewerConfig::default()).unwrap();
        loader.generation = 3;

        loader
            .sender
            .send(LoaderEvent::ColorResolved {
                name: "Bugdroid".to_string(),
                generation: 2,
                color: Rgba::WHITE,
            })
            .unwrap();
        loader
            .sender
            .send(LoaderEvent::ColorResolved {
                name: "Bugdroid".to_string(),
                generation: 3,
                color: Rgba::BLACK,
            })
            .unwrap();

        let events = loader.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            LoaderEvent::ColorResolved { generation, color, .. } => {
                assert_eq!(*generation, 3);
                assert_eq!(*color, Rgba::BLACK);
            }
            _ => panic!("unexpected event"),
        }
    }

    #[test]
    fn request_bumps_generation() {
        let mut loader = ModelLoader::new(&ViewerConfig::default()).unwrap();
        let first = loader.request("Nonexistent");
        let second = loader.request("Nonexistent");
        assert_eq!(second, first + 1);
        assert_eq!(loader.current_generation(), second);
    }

    #[test]
    fn missing_asset_fails_without_panicking() {
        let mut loader = ModelLoader::new(&ViewerConfig::default()).unwrap();
        loader.request("definitely not a model");

        // The load runs on the runtime's blocking pool; poll briefly.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let events = loader.drain();
            if let Some(LoaderEvent::AssetFailed { name, .. }) = events.first() {
                assert_eq!(name, "definitely not a model");
                break;
            }
            assert!(std::time::Instant::now() < deadline, "no failure event");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }
}
