use bevy::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    /// Right mouse: raise the camera to aim or to place the held photo.
    RaiseCamera,
    /// Left mouse: shoot, place, or paint.
    Primary,
}

#[derive(Default, Resource)]
pub struct ActionState {
    pressed: HashMap<PlayerAction, bool>,
    previous: HashMap<PlayerAction, bool>,
}

impl ActionState {
    pub fn set(&mut self, action: PlayerAction, is_pressed: bool) {
        let was = self.pressed.insert(action, is_pressed).unwrap_or(false);
        self.previous.insert(action, was);
    }

    pub fn pressed(&self, action: PlayerAction) -> bool {
        *self.pressed.get(&action).unwrap_or(&false)
    }

    pub fn just_pressed(&self, action: PlayerAction) -> bool {
        self.pressed(action) && !*self.previous.get(&action).unwrap_or(&false)
    }

    pub fn just_released(&self, action: PlayerAction) -> bool {
        !self.pressed(action) && *self.previous.get(&action).unwrap_or(&false)
    }
}
