//! Keyboard state, mapped onto controller port 1.

use indexmap::IndexSet;
use n64_sys::{JoypadButtons, JoypadInputs};
use winit::{
    event::{ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Full stick deflection.
const STICK_MAX: i8 = 80;

const BUTTON_KEYS: &[(KeyCode, JoypadButtons)] = &[
    (KeyCode::Enter, JoypadButtons::START),
    (KeyCode::KeyI, JoypadButtons::C_UP),
    (KeyCode::KeyJ, JoypadButtons::C_LEFT),
    (KeyCode::KeyL, JoypadButtons::C_RIGHT),
    (KeyCode::KeyK, JoypadButtons::C_DOWN),
    (KeyCode::KeyE, JoypadButtons::R),
    (KeyCode::KeyQ, JoypadButtons::Z),
    (KeyCode::Space, JoypadButtons::A),
    (KeyCode::KeyB, JoypadButtons::B),
    (KeyCode::ArrowUp, JoypadButtons::D_UP),
    (KeyCode::ArrowDown, JoypadButtons::D_DOWN),
    (KeyCode::ArrowLeft, JoypadButtons::D_LEFT),
    (KeyCode::ArrowRight, JoypadButtons::D_RIGHT),
];

/// The set of physical keys currently held.
#[derive(Debug, Default)]
pub struct KeyboardInput {
    keys_down: IndexSet<KeyCode>,
}

impl KeyboardInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.key_down_event(key_code),
                        ElementState::Released => self.key_up_event(key_code),
                    }
                }
            }
            WindowEvent::Focused(false) => self.keys_down.clear(),
            _ => {}
        }
    }

    pub fn key_down_event(&mut self, key_code: KeyCode) {
        self.keys_down.insert(key_code);
    }

    pub fn key_up_event(&mut self, key_code: KeyCode) {
        self.keys_down.swap_remove(&key_code);
    }

    pub fn key_down(&self, key_code: KeyCode) -> bool {
        self.keys_down.contains(&key_code)
    }

    /// The controller state these keys represent.
    pub fn joypad_inputs(&self) -> JoypadInputs {
        let mut btn = JoypadButtons::empty();
        for &(key, button) in BUTTON_KEYS {
            if self.key_down(key) {
                btn |= button;
            }
        }

        let axis = |neg: KeyCode, pos: KeyCode| match (self.key_down(neg), self.key_down(pos)) {
            (true, false) => -STICK_MAX,
            (false, true) => STICK_MAX,
            _ => 0,
        };

        JoypadInputs {
            btn,
            stick_x: axis(KeyCode::ArrowLeft, KeyCode::ArrowRight),
            stick_y: axis(KeyCode::ArrowDown, KeyCode::ArrowUp),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let mut input = KeyboardInput::new();
        input.key_down_event(KeyCode::Enter);
        input.key_down_event(KeyCode::KeyI);
        input.key_down_event(KeyCode::KeyQ);

        let inputs = input.joypad_inputs();
        assert_eq!(
            inputs.btn,
            JoypadButtons::START | JoypadButtons::C_UP | JoypadButtons::Z
        );
        assert_eq!((inputs.stick_x, inputs.stick_y), (0, 0));

        input.key_up_event(KeyCode::Enter);
        assert!(!input.joypad_inputs().btn.contains(JoypadButtons::START));
    }

    #[test]
    fn test_arrows_drive_stick() {
        let mut input = KeyboardInput::new();
        input.key_down_event(KeyCode::ArrowLeft);
        input.key_down_event(KeyCode::ArrowUp);

        let inputs = input.joypad_inputs();
        assert_eq!((inputs.stick_x, inputs.stick_y), (-STICK_MAX, STICK_MAX));
        assert!(inputs.btn.contains(JoypadButtons::D_LEFT | JoypadButtons::D_UP));

        // Opposite directions cancel.
        input.key_down_event(KeyCode::ArrowRight);
        assert_eq!(input.joypad_inputs().stick_x, 0);
    }
}
