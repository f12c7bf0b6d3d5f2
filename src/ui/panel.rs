use glam::Vec2;
use imgui::WindowFlags;

use crate::ui::drag::{DragController, PanelFrame};

const DEFAULT_ORIGIN: Vec2 = Vec2::new(16.0, 48.0);
const DEFAULT_SIZE: Vec2 = Vec2::new(260.0, 96.0);

/// The floating model-selection panel. Created once the first model has
/// loaded, dragged by its handle strip, hidden (never destroyed) by the
/// close button.
pub struct SettingsPanel {
    pub frame: PanelFrame,
    hidden: bool,
    drag: DragController,
    options: Vec<String>,
    selected: usize,
}

impl SettingsPanel {
    pub fn new(options: Vec<String>, selected_name: &str) -> Self {
        let selected = options
            .iter()
            .position(|option| option == selected_name)
            .unwrap_or(0);

        Self {
            frame: PanelFrame::new(DEFAULT_ORIGIN, DEFAULT_SIZE),
            hidden: false,
            drag: DragController::new(),
            options,
            selected,
        }
    }

    pub fn selected_name(&self) -> &str {
        self.options
            .get(self.selected)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Hides the panel. Selection and position are preserved; external
    /// code may call [`show`](Self::show) to bring it back.
    pub fn close(&mut self) {
        self.hidden = true;
        self.drag.release();
    }

    pub fn show(&mut self) {
        self.hidden = false;
    }

    /// Raw pointer press in window coordinates. Returns whether the
    /// panel consumed it.
    pub fn pointer_pressed(&mut self, position: Vec2) -> bool {
        if self.hidden {
            return false;
        }
        if self.frame.close_contains(position) {
            self.close();
            return true;
        }
        if self.drag.press(&self.frame, position) {
            return true;
        }
        self.frame.contains(position)
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        self.drag.motion(&mut self.frame, position);
    }

    pub fn pointer_released(&mut self) {
        self.drag.release();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Draws the panel; returns the newly selected model name, if the
    /// selection changed this frame.
    pub fn draw(&mut self, ui: &imgui::Ui) -> Option<String> {
        if self.hidden {
            return None;
        }

        let mut changed = None;

        ui.window("Model")
            .position(self.frame.origin.to_array(), imgui::Condition::Always)
            .size(self.frame.size.to_array(), imgui::Condition::Always)
            .flags(
                WindowFlags::NO_TITLE_BAR
                    | WindowFlags::NO_MOVE
                    | WindowFlags::NO_RESIZE
                    | WindowFlags::NO_COLLAPSE,
            )
            .build(|| {
                // Handle strip: title text plus the close button on the
                // right edge. Dragging itself is hit-tested on raw events.
                ui.text("Model");
                ui.same_line_with_pos(self.frame.size.x - 28.0);
                if ui.small_button("x") {
                    self.close();
                }
                ui.separator();

                if ui.combo_simple_string("model", &mut self.selected, &self.options) {
                    changed = Some(self.options[self.selected].clone());
                }
            });

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> SettingsPanel {
        SettingsPanel::new(
            vec!["Bugdroid".to_string(), "Robo Dog".to_string()],
            "Robo Dog",
        )
    }

    #[test]
    fn close_hides_but_preserves_selection_and_position() {
        let mut panel = panel();
        let origin = panel.frame.origin;
        panel.close();

        assert!(panel.is_hidden());
        assert_eq!(panel.selected_name(), "Robo Dog");
        assert_eq!(panel.frame.origin, origin);

        panel.show();
        assert!(!panel.is_hidden());
        assert_eq!(panel.selected_name(), "Robo Dog");
    }

    #[test]
    fn close_button_press_hides_panel() {
        let mut panel = panel();
        let close_pos = panel.frame.origin + Vec2::new(panel.frame.size.x - 4.0, 4.0);
        assert!(panel.pointer_pressed(close_pos));
        assert!(panel.is_hidden());
    }

    #[test]
    fn drag_sequence_moves_panel_by_delta() {
        let mut panel = panel();
        let start = panel.frame.origin;
        let grab = start + Vec2::new(40.0, 10.0);

        assert!(panel.pointer_pressed(grab));
        panel.pointer_moved(grab + Vec2::new(25.0, 40.0));
        panel.pointer_released();

        assert_eq!(panel.frame.origin, start + Vec2::new(25.0, 40.0));
    }

    #[test]
    fn hidden_panel_ignores_pointer() {
        let mut panel = panel();
        panel.close();
        let handle = panel.frame.origin + Vec2::new(10.0, 10.0);
        assert!(!panel.pointer_pressed(handle));
        assert!(!panel.is_dragging());
    }

    #[test]
    fn unknown_initial_selection_falls_back_to_first_option() {
        let panel = SettingsPanel::new(vec!["Bugdroid".to_string()], "Missing");
        assert_eq!(panel.selected_name(), "Bugdroid");
    }
}
