use std::{
    collections::HashMap,
    path::Path,
    sync::mpsc::{channel, Receiver},
    time::Duration,
};

use anyhow::Context;
use notify_debouncer_mini::{
    new_debouncer_opt, notify::*, DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use wgpu::PollType;

const SHADER_FOLDER: &str = "src/shaders";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderId {
    Mesh,
    Ground,
    Grid,
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderDefinition {
    pub id: ShaderId,
    pub name: &'static str,
    pub path: &'static str,
}

pub type PipelineBuilder =
    Box<dyn FnMut(&wgpu::Device, &str) -> anyhow::Result<wgpu::RenderPipeline> + Send>;

// Compiles WGSL files to pipelines and recompiles them from a watcher
// thread when they change on disk.
pub struct ShaderLoader {
    pipelines: HashMap<ShaderId, wgpu::RenderPipeline>,
    receiver: Receiver<(ShaderId, wgpu::RenderPipeline)>,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ShaderLoader {
    pub fn new(
        device: wgpu::Device,
        shaders: Vec<(ShaderDefinition, PipelineBuilder)>,
    ) -> anyhow::Result<Self> {
        let mut pipelines = HashMap::new();
        let mut builders: Vec<(ShaderDefinition, PipelineBuilder)> = Vec::new();

        for (definition, mut builder) in shaders {
            let pipeline = compile_file(&device, &definition, &mut builder)?;
            pipelines.insert(definition.id, pipeline);
            builders.push((definition, builder));
        }

        let (send_changed, recv_changed) = channel();
        let watcher_device = device.clone();

        let mut debouncer: Debouncer<RecommendedWatcher> = new_debouncer_opt(
            notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    for event in events {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }
                        for (definition, builder) in builders.iter_mut() {
                            if !event.path.ends_with(definition.path) {
                                continue;
                            }
                            log::info!("Reloading shader: {}", definition.name);
                            match compile_file(&watcher_device, definition, builder) {
                                Ok(pipeline) => {
                                    let _ = send_changed.send((definition.id, pipeline));
                                }
                                Err(e) => {
                                    log::error!("Failed to load {}: {}", definition.name, e)
                                }
                            }
                        }
                    }
                }
                Err(e) => log::error!("Error debouncing shader changes: {}", e),
            },
        )
        .context("Failed to create shader watcher")?;

        let absolute_shader_folder = Path::new(SHADER_FOLDER)
            .canonicalize()
            .context("Shader folder not found")?;

        debouncer
            .watcher()
            .watch(&absolute_shader_folder, RecursiveMode::Recursive)
            .context("Failed to watch shader folder")?;

        Ok(Self {
            pipelines,
            receiver: recv_changed,
            _debouncer: debouncer,
        })
    }

    pub fn get(&self, id: ShaderId) -> &wgpu::RenderPipeline {
        &self.pipelines[&id]
    }

    pub fn load_pending_shaders(&mut self) {
        while let Ok((id, pipeline)) = self.receiver.try_recv() {
            self.pipelines.insert(id, pipeline);
        }
    }
}

fn compile_file(
    device: &wgpu::Device,
    definition: &ShaderDefinition,
    builder: &mut PipelineBuilder,
) -> anyhow::Result<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let path = Path::new(SHADER_FOLDER).join(definition.path);
    let shader_code = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read shader file {}: {}", path.display(), e))?;
    let pipeline = builder(device, &shader_code);

    device
        .poll(PollType::Wait)
        .context("Failed to poll device after shader compilation.")?;

    let error = block_on(device.pop_error_scope());

    if let Some(error) = error {
        return Err(anyhow::anyhow!(
            "Shader compilation failed for {}: {}",
            definition.name,
            error
        ));
    };

    pipeline
}
