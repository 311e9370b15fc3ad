//! Session generations
//!
//! Every bind (and every teardown of a live source) moves the source to a new
//! generation. Asynchronous setup work carries the generation it was started
//! for and is dropped on arrival if the source has moved on.

use std::fmt;

/// Identifies one bind of the spectral source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionGeneration(u64);

impl SessionGeneration {
    /// Generation before anything was bound
    pub const INITIAL: SessionGeneration = SessionGeneration(0);

    /// The generation that follows this one
    pub fn next(self) -> Self {
        SessionGeneration(self.0.wrapping_add(1))
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }

    /// True if work tagged with `self` may still act on a source at `current`
    pub fn is_current(self, current: SessionGeneration) -> bool {
        self == current
    }
}

impl fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}
