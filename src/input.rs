//! Input state for one tick
//!
//! The platform layer feeds raw key/button/cursor events in; the simulation
//! queries held keys, click edges and the cursor position. Edge state (the
//! "released this tick" sets) is cleared exactly once per tick by the
//! driver calling `end_tick`.

use std::collections::HashSet;

use glam::Vec2;

/// Semantic game keys, mapped from physical bindings by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Back,
}

#[derive(Debug, Default)]
pub struct Inputs {
    keys_down: HashSet<Key>,
    keys_released: HashSet<Key>,
    buttons_down: HashSet<u8>,
    buttons_released: HashSet<u8>,
    cursor: Vec2,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    // Event feed, called by the platform layer

    pub fn key_pressed(&mut self, key: Key) {
        self.keys_down.insert(key);
    }

    pub fn key_released(&mut self, key: Key) {
        self.keys_down.remove(&key);
        self.keys_released.insert(key);
    }

    pub fn button_pressed(&mut self, button: u8) {
        self.buttons_down.insert(button);
    }

    pub fn button_released(&mut self, button: u8) {
        self.buttons_down.remove(&button);
        self.buttons_released.insert(button);
    }

    pub fn cursor_moved(&mut self, position: Vec2) {
        self.cursor = position;
    }

    /// Drop all held keys, e.g. when the window loses focus
    pub fn clear_held(&mut self) {
        self.keys_down.clear();
        self.buttons_down.clear();
    }

    // Queries

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// True only on the tick the key was released
    pub fn is_key_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }

    pub fn is_button_down(&self, button: u8) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Click-edge detection: true only on the tick the button came up
    pub fn is_button_clicked(&self, button: u8) -> bool {
        self.buttons_released.contains(&button)
    }

    /// Cursor position in viewport pixels, origin top-left
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Cursor in [-1, 1] view coordinates, y up
    pub fn view_cursor(&self, view_width: f32, view_height: f32) -> Vec2 {
        Vec2::new(
            (self.cursor.x / view_width) * 2.0 - 1.0,
            -(self.cursor.y / view_height) * 2.0 + 1.0,
        )
    }

    /// Clear edge state; must run exactly once at the end of each tick
    pub fn end_tick(&mut self) {
        self.buttons_released.clear();
        self.keys_released.clear();
    }
}
