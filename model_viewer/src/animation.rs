//! Pause, rotation and scale state driven by the controller.

use n64_sys::JoypadButtons;

/// Y rotation rate while the model spins on its own, in radians per second.
pub const IDLE_ROTATION_RATE: f32 = 0.2;
/// Rotation rate of a held axis while paused.
pub const MANUAL_ROTATION_RATE: f32 = 2.0;
pub const SCALE_RATE: f32 = 0.05;
pub const DEFAULT_SCALE: f32 = 0.1;
pub const MIN_SCALE: f32 = 0.01;
pub const MAX_SCALE: f32 = 2.0;

pub fn fclamp(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub paused: bool,
    /// Which axes were rotating during the last paused update.
    pub rotating: [bool; 3],
    /// Euler angles in radians. These are never wrapped.
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            paused: false,
            rotating: [false; 3],
            rotation: [0.0; 3],
            scale: DEFAULT_SCALE,
        }
    }
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `delta` seconds given the buttons held now and those pressed since
    /// the previous poll.
    pub fn advance(&mut self, delta: f32, held: JoypadButtons, pressed: JoypadButtons) {
        if pressed.contains(JoypadButtons::START) {
            self.paused = !self.paused;
        }

        if self.paused {
            self.rotating = [
                held.contains(JoypadButtons::C_UP),
                held.contains(JoypadButtons::C_LEFT),
                held.contains(JoypadButtons::C_RIGHT),
            ];
            for (angle, &rotating) in self.rotation.iter_mut().zip(&self.rotating) {
                if rotating {
                    *angle -= MANUAL_ROTATION_RATE * delta;
                }
            }

            if held.contains(JoypadButtons::R) {
                self.scale += SCALE_RATE * delta;
            }
            if held.contains(JoypadButtons::Z) {
                self.scale -= SCALE_RATE * delta;
            }
            self.scale = fclamp(self.scale, MIN_SCALE, MAX_SCALE);
        } else {
            self.rotation[0] = 0.0;
            self.rotation[1] -= IDLE_ROTATION_RATE * delta;
            self.rotation[2] = 0.0;
            self.scale = DEFAULT_SCALE;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const NONE: JoypadButtons = JoypadButtons::empty();

    fn paused() -> AnimationState {
        let mut state = AnimationState::new();
        state.advance(0.0, NONE, JoypadButtons::START);
        assert!(state.paused);
        state
    }

    #[test]
    fn test_pause_parity() {
        for n in 0..7 {
            let mut state = AnimationState::new();
            for _ in 0..n {
                state.advance(0.016, JoypadButtons::START, JoypadButtons::START);
                // Holding start between presses does not toggle again.
                state.advance(0.016, JoypadButtons::START, NONE);
            }
            assert_eq!(state.paused, n % 2 == 1, "n = {}", n);
        }
    }

    #[test]
    fn test_scale_stays_clamped() {
        let mut state = paused();
        let deltas = [0.5, 3.0, 10.0, 0.016, 100.0, 7.5];

        for &delta in &deltas {
            state.advance(delta, JoypadButtons::R, NONE);
            assert!(state.scale >= MIN_SCALE && state.scale <= MAX_SCALE);
        }
        assert_eq!(state.scale, MAX_SCALE);

        for &delta in &deltas {
            state.advance(delta, JoypadButtons::Z, NONE);
            assert!(state.scale >= MIN_SCALE && state.scale <= MAX_SCALE);
        }
        assert_eq!(state.scale, MIN_SCALE);

        state.advance(1.0, JoypadButtons::R | JoypadButtons::Z, NONE);
        assert!(state.scale >= MIN_SCALE && state.scale <= MAX_SCALE);
    }

    #[test]
    fn test_unpaused_ignores_held_buttons() {
        let mut state = AnimationState::new();
        let held = JoypadButtons::C_UP | JoypadButtons::C_RIGHT | JoypadButtons::R;
        let deltas = [0.016f32, 0.033, 0.25, 1.0];

        let mut expected_y = 0.0f32;
        for &delta in &deltas {
            state.advance(delta, held, NONE);
            expected_y -= IDLE_ROTATION_RATE * delta;
        }

        assert!((state.rotation[1] - expected_y).abs() < 1e-6);
        assert_eq!(state.rotation[0], 0.0);
        assert_eq!(state.rotation[2], 0.0);
        assert_eq!(state.scale, DEFAULT_SCALE);
    }

    #[test]
    fn test_paused_axes_are_independent() {
        let mut state = paused();
        let before = state.rotation;
        let deltas = [0.1f32, 0.2, 0.05];

        for &delta in &deltas {
            state.advance(delta, JoypadButtons::C_UP, NONE);
        }

        let total: f32 = deltas.iter().sum();
        assert!((state.rotation[0] - (before[0] - MANUAL_ROTATION_RATE * total)).abs() < 1e-5);
        assert_eq!(state.rotation[1], before[1]);
        assert_eq!(state.rotation[2], before[2]);
        assert_eq!(state.rotating, [true, false, false]);
    }

    #[test]
    fn test_unpausing_resets_scale() {
        let mut state = paused();
        state.advance(1.0, JoypadButtons::R, NONE);
        assert!(state.scale > DEFAULT_SCALE);

        state.advance(0.0, NONE, JoypadButtons::START);
        assert!(!state.paused);
        assert_eq!(state.scale, DEFAULT_SCALE);
    }

    #[test]
    fn test_fclamp() {
        assert_eq!(fclamp(3.0, 0.01, 2.0), 2.0);
        assert_eq!(fclamp(-1.0, 0.01, 2.0), 0.01);
        assert_eq!(fclamp(1.5, 0.01, 2.0), 1.5);
    }
}
