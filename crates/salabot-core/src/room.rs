//! The fixed set of bookable meeting rooms.

use serde::{Deserialize, Serialize};

/// A meeting room.
///
/// The room inventory is fixed; adding a room is a code change, which is
/// what keeps conflict detection a pure function over an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Grande,
    Menor,
    MenorComMesa,
}

impl Room {
    /// Every room, in the order they are offered during booking.
    pub const ALL: [Room; 3] = [Room::Grande, Room::Menor, Room::MenorComMesa];

    /// Returns the human-readable room name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Grande => "Sala Grande",
            Self::Menor => "Sala Menor",
            Self::MenorComMesa => "Sala Menor C/Mesa",
        }
    }

    /// Looks a room up by its display name.
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.display_name() == name)
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
