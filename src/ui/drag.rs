use glam::Vec2;

/// Height of the drag handle strip at the top of the panel.
pub const HANDLE_HEIGHT: f32 = 24.0;
/// Side length of the close button square in the handle's top-right corner.
pub const CLOSE_BUTTON_SIZE: f32 = 18.0;

/// Panel rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelFrame {
    pub origin: Vec2,
    pub size: Vec2,
}

impl PanelFrame {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.x
            && point.y < self.origin.y + self.size.y
    }

    /// The close button area takes precedence over the handle.
    pub fn close_contains(&self, point: Vec2) -> bool {
        let left = self.origin.x + self.size.x - CLOSE_BUTTON_SIZE;
        point.x >= left
            && point.x < self.origin.x + self.size.x
            && point.y >= self.origin.y
            && point.y < self.origin.y + CLOSE_BUTTON_SIZE
    }

    pub fn handle_contains(&self, point: Vec2) -> bool {
        if self.close_contains(point) {
            return false;
        }
        point.x >= self.origin.x
            && point.x < self.origin.x + self.size.x
            && point.y >= self.origin.y
            && point.y < self.origin.y + HANDLE_HEIGHT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragPhase {
    Idle,
    Dragging {
        /// Pointer offset from the panel origin, captured on press. Kept
        /// constant while dragging so the grab point stays under the
        /// pointer.
        grab: Vec2,
    },
}

/// Idle → Dragging on press over the handle, back to Idle on release.
pub struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub fn new() -> Self {
        Self {
            phase: DragPhase::Idle,
        }
    }

    /// Returns whether a drag started.
    pub fn press(&mut self, frame: &PanelFrame, pointer: Vec2) -> bool {
        if frame.handle_contains(pointer) {
            self.phase = DragPhase::Dragging {
                grab: pointer - frame.origin,
            };
            true
        } else {
            false
        }
    }

    pub fn motion(&mut self, frame: &mut PanelFrame, pointer: Vec2) {
        if let DragPhase::Dragging { grab } = self.phase {
            frame.origin = pointer - grab;
        }
    }

    pub fn release(&mut self) {
        self.phase = DragPhase::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> PanelFrame {
        PanelFrame::new(Vec2::new(100.0, 100.0), Vec2::new(260.0, 120.0))
    }

    #[test]
    fn press_move_release_translates_by_pointer_delta() {
        let mut frame = frame();
        let mut drag = DragController::new();

        let press_at = Vec2::new(150.0, 110.0);
        assert!(drag.press(&frame, press_at));
        assert!(drag.is_dragging());

        drag.motion(&mut frame, press_at + Vec2::new(33.0, -17.0));
        drag.release();

        assert_eq!(frame.origin, Vec2::new(133.0, 83.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn motion_after_release_does_not_move() {
        let mut frame = frame();
        let mut drag = DragController::new();

        drag.press(&frame, Vec2::new(150.0, 110.0));
        drag.release();
        drag.motion(&mut frame, Vec2::new(500.0, 500.0));

        assert_eq!(frame.origin, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn press_outside_handle_does_not_start_drag() {
        let frame = frame();
        let mut drag = DragController::new();

        // Inside the panel body but below the handle strip.
        assert!(!drag.press(&frame, Vec2::new(150.0, 180.0)));
        // On the close button.
        assert!(!drag.press(&frame, Vec2::new(355.0, 105.0)));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn close_button_takes_precedence_over_handle() {
        let frame = frame();
        assert!(frame.close_contains(Vec2::new(350.0, 110.0)));
        assert!(!frame.handle_contains(Vec2::new(350.0, 110.0)));
        assert!(frame.handle_contains(Vec2::new(150.0, 110.0)));
    }
}
