use std::collections::VecDeque;

const WINDOW: usize = 120;

/// Rolling frame-time window behind the performance overlay.
pub struct FrameStats {
    frame_times: VecDeque<f32>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(WINDOW),
        }
    }

    pub fn record(&mut self, dt: f32) {
        if self.frame_times.len() == WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);
    }

    pub fn frame_ms(&self) -> f32 {
        self.average() * 1000.0
    }

    pub fn fps(&self) -> f32 {
        let avg = self.average();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    fn average(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    pub fn draw_ui(&self, ui: &imgui::Ui) {
        ui.window("Stats")
            .position([8.0, 8.0], imgui::Condition::FirstUseEver)
            .size([120.0, 0.0], imgui::Condition::FirstUseEver)
            .no_decoration()
            .bg_alpha(0.6)
            .build(|| {
                ui.text(format!("{:5.1} fps", self.fps()));
                ui.text(format!("{:5.2} ms", self.frame_ms()));
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_recorded_frames() {
        let mut stats = FrameStats::new();
        for _ in 0..10 {
            stats.record(1.0 / 60.0);
        }
        assert!((stats.fps() - 60.0).abs() < 0.5);
        assert!((stats.frame_ms() - 16.666).abs() < 0.1);
    }

    #[test]
    fn empty_window_reports_zero() {
        let stats = FrameStats::new();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.frame_ms(), 0.0);
    }

    #[test]
    fn window_is_bounded() {
        let mut stats = FrameStats::new();
        for _ in 0..WINDOW {
            stats.record(1.0);
        }
        // Old slow frames age out once faster frames fill the window.
        for _ in 0..WINDOW {
            stats.record(0.01);
        }
        assert!((stats.frame_ms() - 10.0).abs() < 0.01);
    }
}
