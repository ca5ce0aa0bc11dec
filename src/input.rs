use glam::Vec2;

/// Already-decoded player intents for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputIntents {
    pub move_forward: bool,
    pub move_back: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    /// Multiplier on walking speed, 1.0 for a normal walk.
    pub sprint_factor: f32,
}

impl Default for InputIntents {
    fn default() -> Self {
        InputIntents {
            move_forward: false,
            move_back: false,
            move_left: false,
            move_right: false,
            jump: false,
            sprint_factor: 1.0,
        }
    }
}

impl InputIntents {
    /// Unit walking direction in screen space (forward is up), zero when idle
    /// or when opposite intents cancel out.
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.move_forward {
            dir.y -= 1.0;
        }
        if self.move_back {
            dir.y += 1.0;
        }
        if self.move_left {
            dir.x -= 1.0;
        }
        if self.move_right {
            dir.x += 1.0;
        }
        dir.normalize_or_zero()
    }

    pub fn is_moving(&self) -> bool {
        self.direction() != Vec2::ZERO
    }
}
