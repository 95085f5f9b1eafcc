use std::collections::{HashMap, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::CameraMovement;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if ch.is_ascii_digit() {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
        }
        if let Some(function) = name.strip_prefix('F').or_else(|| name.strip_prefix('f')) {
            if let Ok(index) = function.parse::<u8>() {
                if (1..=25).contains(&index) {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        "LeftAlt" | "LAlt" => LeftAlt,
        "RightAlt" | "RAlt" => RightAlt,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the non-character keys the viewer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
}

/// Per-frame input snapshot owned by the main loop.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    cursor: Option<Vec2>,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as held. Returns `true` on the initial press only.
    pub fn set_key_down(&mut self, key: KeyCode) -> bool {
        self.keys.insert(key)
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn set_cursor_position(&mut self, position: Vec2) {
        self.cursor = Some(position);
    }

    /// Offsets the cursor by a raw pointer delta and returns the new
    /// position. The position is virtual and never bounded by the window.
    pub fn move_cursor_by(&mut self, delta: Vec2) -> Vec2 {
        let position = self.cursor.unwrap_or(Vec2::ZERO) + delta;
        self.cursor = Some(position);
        position
    }

    pub fn add_scroll(&mut self, amount: f32) {
        self.scroll += amount;
    }

    /// Returns the scroll accumulated since the last call and clears it.
    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }

    /// Drops every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys.clear();
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }
}

/// Key to camera movement table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    movements: HashMap<KeyCode, CameraMovement>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let movements = [
            (KeyCode::Character('W'), CameraMovement::Forward),
            (KeyCode::Character('S'), CameraMovement::Backward),
            (KeyCode::Character('A'), CameraMovement::Left),
            (KeyCode::Character('D'), CameraMovement::Right),
            (KeyCode::Named(NamedKey::Space), CameraMovement::Up),
            (KeyCode::Named(NamedKey::LeftShift), CameraMovement::Down),
        ]
        .into_iter()
        .collect();
        Self { movements }
    }
}

impl KeyBindings {
    /// Binds `key` to `movement`, replacing whatever the key did before.
    pub fn bind(&mut self, key: KeyCode, movement: CameraMovement) {
        self.movements.insert(key, movement);
    }

    /// Removes every key bound to `movement`.
    pub fn clear(&mut self, movement: CameraMovement) {
        self.movements.retain(|_, bound| *bound != movement);
    }

    /// Movements whose key is held in `input`.
    pub fn held_movements<'a>(
        &'a self,
        input: &'a InputState,
    ) -> impl Iterator<Item = CameraMovement> + 'a {
        self.movements
            .iter()
            .filter(|(key, _)| input.is_key_down(**key))
            .map(|(_, movement)| *movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_character_keys() {
        assert_eq!(
            KeyCode::from_name("Space"),
            Some(KeyCode::Named(NamedKey::Space))
        );
        assert_eq!(KeyCode::from_name("w"), Some(KeyCode::Character('W')));
        assert_eq!(KeyCode::from_name("7"), Some(KeyCode::Digit(7)));
        assert_eq!(KeyCode::from_name("F12"), Some(KeyCode::Function(12)));
        assert_eq!(KeyCode::from_name("F30"), None);
        assert_eq!(KeyCode::from_name("Banana"), None);
    }

    #[test]
    fn input_state_tracks_keys() {
        let mut state = InputState::new();
        assert!(state.set_key_down(KeyCode::Named(NamedKey::Space)));
        assert!(!state.set_key_down(KeyCode::Named(NamedKey::Space)));
        assert!(state.is_key_down(KeyCode::Named(NamedKey::Space)));
        state.set_key_up(KeyCode::Named(NamedKey::Space));
        assert!(!state.is_key_down(KeyCode::Named(NamedKey::Space)));
    }

    #[test]
    fn pointer_deltas_accumulate_without_bounds() {
        let mut state = InputState::new();
        assert_eq!(state.move_cursor_by(Vec2::new(5.0, -2.0)), Vec2::new(5.0, -2.0));
        for _ in 0..100 {
            state.move_cursor_by(Vec2::new(100.0, 0.0));
        }
        assert_eq!(state.cursor_position(), Some(Vec2::new(10_005.0, -2.0)));

        state.set_cursor_position(Vec2::new(10.0, 10.0));
        assert_eq!(state.move_cursor_by(Vec2::new(-20.0, 0.0)), Vec2::new(-10.0, 10.0));
    }

    #[test]
    fn scroll_accumulates_until_taken() {
        let mut state = InputState::new();
        state.add_scroll(1.0);
        state.add_scroll(0.5);
        assert_eq!(state.take_scroll(), 1.5);
        assert_eq!(state.take_scroll(), 0.0);
    }

    #[test]
    fn default_bindings_report_held_movements() {
        let bindings = KeyBindings::default();
        let mut state = InputState::new();
        state.set_key_down(KeyCode::Character('W'));
        state.set_key_down(KeyCode::Named(NamedKey::LeftShift));
        state.set_key_down(KeyCode::Character('Q'));
        let mut held: Vec<_> = bindings.held_movements(&state).collect();
        held.sort_by_key(|m| *m as u8);
        assert_eq!(held, vec![CameraMovement::Forward, CameraMovement::Down]);

        state.release_all();
        assert_eq!(bindings.held_movements(&state).count(), 0);
    }

    #[test]
    fn rebinding_replaces_movement() {
        let mut bindings = KeyBindings::default();
        bindings.clear(CameraMovement::Forward);
        bindings.bind(KeyCode::Named(NamedKey::Up), CameraMovement::Forward);
        bindings.bind(KeyCode::Named(NamedKey::Space), CameraMovement::Backward);

        let mut state = InputState::new();
        state.set_key_down(KeyCode::Character('W'));
        assert_eq!(bindings.held_movements(&state).count(), 0);

        state.set_key_down(KeyCode::Named(NamedKey::Up));
        state.set_key_down(KeyCode::Named(NamedKey::Space));
        let mut held: Vec<_> = bindings.held_movements(&state).collect();
        held.sort_by_key(|m| *m as u8);
        assert_eq!(held, vec![CameraMovement::Forward, CameraMovement::Backward]);
    }
}
