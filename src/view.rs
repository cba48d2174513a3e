//! View state and keyboard handling shared by the three viewers.
//!
//! The state is an explicit struct owned by the event loop and passed by
//! reference into input handling and frame rendering; nothing here is
//! process-global.

use winit::{ElementState, KeyboardInput, VirtualKeyCode};

use std::collections::HashSet;

/// Center of the view at startup and after a reset.
pub const HOME_CENTER: (f64, f64) = (-0.5, 0.0);
/// Extent scale at startup and after a reset.
pub const HOME_ZOOM: f64 = 2.0;

const ITERATION_MIN: u32 = 10;
const ITERATION_MAX: u32 = 1000;
const ITERATION_STEP: u32 = 5;

/// Pan distance per frame, as a fraction of the current zoom.
const PAN_FACTOR: f64 = 0.01;
/// Per-frame extent multipliers for the zoom keys.
const ZOOM_IN_RATIO: f64 = 0.95;
const ZOOM_OUT_RATIO: f64 = 1.05;

/// The mutable view parameters: complex-plane center, extent scale and
/// iteration bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
    pub max_iterations: u32,
    default_iterations: u32,
}

impl ViewState {
    /// A view of the full set, with the given iteration bound as both the
    /// starting value and the value restored by [`ViewState::reset`].
    pub fn new(default_iterations: u32) -> ViewState {
        ViewState {
            center_x: HOME_CENTER.0,
            center_y: HOME_CENTER.1,
            zoom: HOME_ZOOM,
            max_iterations: default_iterations,
            default_iterations,
        }
    }

    /// Per-frame pan distance: deeper zooms pan proportionally slower.
    pub fn pan_step(&self) -> f64 {
        self.zoom * PAN_FACTOR
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center_x += dx;
        self.center_y += dy;
    }

    pub fn zoom_in(&mut self) {
        self.zoom *= ZOOM_IN_RATIO;
    }

    pub fn zoom_out(&mut self) {
        self.zoom *= ZOOM_OUT_RATIO;
    }

    pub fn raise_iterations(&mut self) {
        self.max_iterations = u32::min(self.max_iterations + ITERATION_STEP, ITERATION_MAX);
    }

    pub fn lower_iterations(&mut self) {
        self.max_iterations =
            u32::max(self.max_iterations.saturating_sub(ITERATION_STEP), ITERATION_MIN);
    }

    pub fn reset(&mut self) {
        self.center_x = HOME_CENTER.0;
        self.center_y = HOME_CENTER.1;
        self.zoom = HOME_ZOOM;
        self.max_iterations = self.default_iterations;
    }
}

/// Tracks which keys are currently held, turning winit's edge-triggered
/// events back into the per-frame key polling the view update wants.
#[derive(Debug, Default)]
pub struct KeyTracker {
    held: HashSet<VirtualKeyCode>,
}

impl KeyTracker {
    pub fn new() -> KeyTracker {
        KeyTracker::default()
    }

    pub fn record(&mut self, input: KeyboardInput) {
        if let Some(code) = input.virtual_keycode {
            match input.state {
                ElementState::Pressed => {
                    self.held.insert(code);
                }
                ElementState::Released => {
                    self.held.remove(&code);
                }
            }
        }
    }

    pub fn held(&self, code: VirtualKeyCode) -> bool {
        self.held.contains(&code)
    }

    /// Applies one frame's worth of movement for every held key.
    pub fn apply(&self, view: &mut ViewState) {
        let step = view.pan_step();

        if self.held(VirtualKeyCode::W) {
            view.pan(0.0, step);
        }
        if self.held(VirtualKeyCode::S) {
            view.pan(0.0, -step);
        }
        if self.held(VirtualKeyCode::A) {
            view.pan(-step, 0.0);
        }
        if self.held(VirtualKeyCode::D) {
            view.pan(step, 0.0);
        }

        if self.held(VirtualKeyCode::Q) {
            view.zoom_in();
        }
        if self.held(VirtualKeyCode::E) {
            view.zoom_out();
        }

        if self.held(VirtualKeyCode::Up) {
            view.raise_iterations();
        }
        if self.held(VirtualKeyCode::Down) {
            view.lower_iterations();
        }

        if self.held(VirtualKeyCode::R) {
            view.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::ModifiersState;

    fn key(code: VirtualKeyCode, state: ElementState) -> KeyboardInput {
        KeyboardInput {
            scancode: 0,
            state,
            virtual_keycode: Some(code),
            modifiers: ModifiersState::default(),
        }
    }

    #[test]
    fn iterations_saturate_at_upper_clamp() {
        let mut view = ViewState::new(100);
        for _ in 0..200 {
            view.raise_iterations();
        }
        assert_eq!(view.max_iterations, 1000);
    }

    #[test]
    fn iterations_saturate_at_lower_clamp() {
        let mut view = ViewState::new(100);
        for _ in 0..200 {
            view.lower_iterations();
        }
        assert_eq!(view.max_iterations, 10);
    }

    #[test]
    fn iteration_step_is_five() {
        let mut view = ViewState::new(100);
        view.raise_iterations();
        assert_eq!(view.max_iterations, 105);
        view.lower_iterations();
        view.lower_iterations();
        assert_eq!(view.max_iterations, 95);
    }

    #[test]
    fn reset_restores_defaults_regardless_of_prior_state() {
        for &default in &[100, 500] {
            let mut view = ViewState::new(default);
            view.pan(3.25, -1.5);
            view.zoom_in();
            view.zoom_in();
            for _ in 0..40 {
                view.raise_iterations();
            }

            view.reset();
            assert_eq!(view.center_x, -0.5);
            assert_eq!(view.center_y, 0.0);
            assert_eq!(view.zoom, 2.0);
            assert_eq!(view.max_iterations, default);
        }
    }

    #[test]
    fn pan_step_is_proportional_to_zoom() {
        let mut view = ViewState::new(100);
        assert_eq!(view.pan_step(), 0.02);
        view.zoom = 1e-6;
        assert_eq!(view.pan_step(), 1e-8);
    }

    #[test]
    fn tracker_follows_press_and_release() {
        let mut keys = KeyTracker::new();
        keys.record(key(VirtualKeyCode::W, ElementState::Pressed));
        assert!(keys.held(VirtualKeyCode::W));

        // Repeated presses while held are fine.
        keys.record(key(VirtualKeyCode::W, ElementState::Pressed));
        assert!(keys.held(VirtualKeyCode::W));

        keys.record(key(VirtualKeyCode::W, ElementState::Released));
        assert!(!keys.held(VirtualKeyCode::W));
    }

    #[test]
    fn held_pan_key_moves_center_each_frame() {
        let mut keys = KeyTracker::new();
        let mut view = ViewState::new(100);
        keys.record(key(VirtualKeyCode::D, ElementState::Pressed));

        keys.apply(&mut view);
        keys.apply(&mut view);
        assert!((view.center_x - (-0.5 + 2.0 * 0.02)).abs() < 1e-12);
        assert_eq!(view.center_y, 0.0);
    }

    #[test]
    fn held_reset_key_restores_home_view() {
        let mut keys = KeyTracker::new();
        let mut view = ViewState::new(500);
        view.pan(1.0, 1.0);
        view.zoom_out();

        keys.record(key(VirtualKeyCode::R, ElementState::Pressed));
        keys.apply(&mut view);
        assert_eq!(view, ViewState::new(500));
    }
}
