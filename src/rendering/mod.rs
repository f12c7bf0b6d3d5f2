pub mod environment;
pub mod imgui_renderer;
pub mod instance;
pub mod render_model;
pub mod renderer;
