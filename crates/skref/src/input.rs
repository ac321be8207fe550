//! Input as the kernel sees it.
//!
//! Controllers only ask "is this [`Action`] active?" through [`InputSource`].
//! Where the answer comes from (a keyboard, a script, a network peer) is not
//! the kernel's business.
//!
//! [`Input<T>`] tracks pressed / just-pressed / just-released state for any
//! key type and is an [`InputSource`] over [`Action`] directly. With the
//! `keyboard` feature, `Input<KeyCode>` maps winit keys onto actions.

use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

/// Something a controller can ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Run,
    Interact,
}

/// Polled, synchronous input.
pub trait InputSource {
    fn is_active(&self, action: Action) -> bool;

    /// Refresh state before a logic tick at simulation time `now`.
    fn poll(&mut self, _now: Duration) {}
}

/// An input source where nothing is ever pressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn is_active(&self, _action: Action) -> bool {
        false
    }
}

/// Tracks the state of a set of inputs.
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed since the last [`clear_just`](Self::clear_just)
/// - `just_released`: released since the last [`clear_just`](Self::clear_just)
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-tick state.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for Input<Action> {
    fn is_active(&self, action: Action) -> bool {
        self.pressed(action)
    }

    fn poll(&mut self, _now: Duration) {
        self.clear_just();
    }
}

// ── Scripted input ──────────────────────────────────────────────────────

/// Replays presses and releases at fixed simulation times. Used by headless
/// demos and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: Vec<(Duration, Action, bool)>,
    cursor: usize,
    state: Input<Action>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_at(mut self, at: Duration, action: Action) -> Self {
        self.push(at, action, true);
        self
    }

    pub fn release_at(mut self, at: Duration, action: Action) -> Self {
        self.push(at, action, false);
        self
    }

    fn push(&mut self, at: Duration, action: Action, down: bool) {
        let pos = self.events.partition_point(|(t, _, _)| *t <= at);
        self.events.insert(pos, (at, action, down));
    }
}

impl InputSource for ScriptedInput {
    fn is_active(&self, action: Action) -> bool {
        self.state.pressed(action)
    }

    fn poll(&mut self, now: Duration) {
        self.state.clear_just();
        while let Some((at, action, down)) = self.events.get(self.cursor).copied() {
            if at > now {
                break;
            }
            if down {
                self.state.press(action);
            } else {
                self.state.release(action);
            }
            self.cursor += 1;
        }
    }
}

// ── Keyboard mapping ────────────────────────────────────────────────────

#[cfg(feature = "keyboard")]
pub use keyboard::{KeyCode, action_for_key};

#[cfg(feature = "keyboard")]
mod keyboard {
    use super::{Action, Input, InputSource};

    pub use winit::keyboard::KeyCode;

    /// The action a key drives, if any.
    pub fn action_for_key(key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::KeyA | KeyCode::ArrowLeft => Some(Action::Left),
            KeyCode::KeyD | KeyCode::ArrowRight => Some(Action::Right),
            KeyCode::KeyW | KeyCode::ArrowUp => Some(Action::Up),
            KeyCode::KeyS | KeyCode::ArrowDown => Some(Action::Down),
            KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(Action::Run),
            KeyCode::KeyE => Some(Action::Interact),
            _ => None,
        }
    }

    impl InputSource for Input<KeyCode> {
        fn is_active(&self, action: Action) -> bool {
            self.pressed.iter().any(|key| action_for_key(*key) == Some(action))
        }

        fn poll(&mut self, _now: std::time::Duration) {
            self.clear_just();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn arrows_and_letters_share_actions() {
            let mut keys = Input::new();
            keys.press(KeyCode::ArrowLeft);
            assert!(keys.is_active(Action::Left));
            keys.release(KeyCode::ArrowLeft);
            keys.press(KeyCode::KeyA);
            assert!(keys.is_active(Action::Left));
            assert!(!keys.is_active(Action::Right));
            assert_eq!(action_for_key(KeyCode::ShiftRight), Some(Action::Run));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_release_edges() {
        let mut input = Input::new();
        input.press(Action::Left);
        input.press(Action::Left);
        assert!(input.pressed(Action::Left));
        assert!(input.just_pressed(Action::Left));
        input.clear_just();
        assert!(!input.just_pressed(Action::Left));
        input.release(Action::Left);
        assert!(input.just_released(Action::Left));
        assert!(!input.pressed(Action::Left));
    }

    #[test]
    fn script_applies_events_up_to_now() {
        let ms = Duration::from_millis;
        let mut script = ScriptedInput::new()
            .release_at(ms(50), Action::Right)
            .press_at(ms(10), Action::Right);
        script.poll(ms(5));
        assert!(!script.is_active(Action::Right));
        script.poll(ms(10));
        assert!(script.is_active(Action::Right));
        script.poll(ms(60));
        assert!(!script.is_active(Action::Right));
        assert!(!NoInput.is_active(Action::Right));
    }
}
