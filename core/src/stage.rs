//! Stage actor model
//!
//! The sprite is owned jointly by the renderer (which reads it every frame)
//! and the engine (which writes it while an action is in flight).

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Position, heading and scale of the stage actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub x: f64,
    pub y: f64,
    /// Heading in degrees; 0 faces +x
    pub rotation: f64,
    pub scale: f64,
}

impl Sprite {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
        }
    }

    /// Restore the defaults (0, 0, 0°, scale 1)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Handle that can be shared with the engine
    pub fn shared() -> SharedSprite {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSprite = Rc<RefCell<Sprite>>;
