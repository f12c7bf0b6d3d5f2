use anyhow::Result;

mod animation;
mod camera;
mod color;
mod config;
mod controls;
mod loader;
mod model;
mod rendering;
mod scene_graph;
mod shader_loader;
mod stats;
mod texture;
mod ui;
mod viewer;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run())?;

    Ok(())
}
