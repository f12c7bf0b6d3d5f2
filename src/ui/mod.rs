pub mod drag;
pub mod panel;
