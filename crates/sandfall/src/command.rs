//! Player actions the engine understands.
//!
//! Input polling lives outside the engine; a front end maps its mouse and
//! key state to these commands and hands them to [`crate::Engine::apply`].

use sandfall_core::Brush;

/// One action applied between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Pour a water circle centered on (x, y).
    PourWater {
        /// Center column.
        x: i32,
        /// Center row.
        y: i32,
    },
    /// Pour a lava circle centered on (x, y).
    PourLava {
        /// Center column.
        x: i32,
        /// Center row.
        y: i32,
    },
    /// Clear a circle centered on (x, y) to air.
    Erase {
        /// Center column.
        x: i32,
        /// Center row.
        y: i32,
    },
    /// Apply an arbitrary brush.
    Paint(Brush),
    /// Throw the world away and generate a new one.
    Regenerate {
        /// Seed of the new world.
        seed: u32,
    },
    /// One more tick per second.
    TickrateUp,
    /// One fewer tick per second, never below 1.
    TickrateDown,
    /// Stop the engine.
    Quit,
}

impl Command {
    /// The brush this command paints with, if it paints.
    #[must_use]
    pub const fn brush(&self) -> Option<Brush> {
        match *self {
            Self::PourWater { x, y } => Some(Brush::water(x, y)),
            Self::PourLava { x, y } => Some(Brush::lava(x, y)),
            Self::Erase { x, y } => Some(Brush::erase(x, y)),
            Self::Paint(brush) => Some(brush),
            Self::Regenerate { .. } | Self::TickrateUp | Self::TickrateDown | Self::Quit => None,
        }
    }
}
