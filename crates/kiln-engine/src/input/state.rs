use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Current input state for the window.
#[derive(Debug)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,
}

impl Default for InputState {
    fn default() -> Self {
        // winit only reports focus changes; a fresh window starts focused
        Self {
            focused: true,
            keys_down: HashSet::new(),
        }
    }
}

impl InputState {
    /// Applies an input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(f) => {
                self.focused = *f;
                frame.focus_changed = Some(*f);
                if !*f {
                    // no stuck keys when focus leaves mid-press
                    self.keys_down.clear();
                }
            }

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(*key) {
                        frame.keys_pressed.insert(*key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(key) {
                        frame.keys_released.insert(*key);
                    }
                }
            },
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// `+1` while only `positive` is held, `-1` while only `negative` is, else `0`.
    pub fn axis(&self, negative: Key, positive: Key) -> f32 {
        match (self.key_down(negative), self.key_down(positive)) {
            (false, true) => 1.0,
            (true, false) => -1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            repeat: false,
        }
    }

    #[test]
    fn repeat_press_is_not_a_new_transition() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        frame.clear();
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));

        assert!(state.key_down(Key::W));
        assert!(!frame.key_pressed(Key::W));
        assert_eq!(frame.events.len(), 1);
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::A, KeyState::Pressed));
        state.apply_event(&mut frame, InputEvent::Focused(false));

        assert!(!state.focused);
        assert!(state.keys_down.is_empty());
        assert_eq!(frame.focus_changed, Some(false));
    }

    #[test]
    fn opposing_keys_cancel_on_an_axis() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed));
        assert_eq!(state.axis(Key::S, Key::W), 1.0);

        state.apply_event(&mut frame, key(Key::S, KeyState::Pressed));
        assert_eq!(state.axis(Key::S, Key::W), 0.0);

        state.apply_event(&mut frame, key(Key::W, KeyState::Released));
        assert_eq!(state.axis(Key::S, Key::W), -1.0);
        assert!(frame.keys_released.contains(&Key::W));
    }
}
