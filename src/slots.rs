//! Player Slots
//!
//! Fixed-capacity table of connected players. Slot indices are reused after
//! a disconnect, so anything that outlives a tick must remember the
//! [`PlayerId`] and look the slot up again instead of trusting the index.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::record::PlayerProfile;
use crate::timer::TimerPair;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable player identity (platform account id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the slot table, assigned by the host on connect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerSlot(pub usize);

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Slot table errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// Index past the table capacity.
    #[error("Slot {0} is out of range")]
    OutOfRange(PlayerSlot),

    /// Slot already holds a player.
    #[error("Slot {0} is already occupied")]
    Occupied(PlayerSlot),

    /// Slot holds no player.
    #[error("Slot {0} is empty")]
    Empty(PlayerSlot),
}

// =============================================================================
// ENTRIES
// =============================================================================

/// A connected player.
#[derive(Clone, Debug)]
pub struct PlayerEntry {
    /// Identity
    pub player: PlayerId,
    /// Display name
    pub name: String,
    /// Main and stage timers
    pub timers: TimerPair,
    /// Store profile, once looked up
    pub profile: Option<PlayerProfile>,
}

impl PlayerEntry {
    /// Fresh entry with stopped timers on the main track.
    pub fn new(player: PlayerId, name: impl Into<String>) -> Self {
        Self {
            player,
            name: name.into(),
            timers: TimerPair::new(),
            profile: None,
        }
    }
}

/// Fixed-capacity slot table.
#[derive(Clone, Debug)]
pub struct PlayerSlotTable {
    slots: Vec<Option<PlayerEntry>>,
}

impl PlayerSlotTable {
    /// Table with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of connected players.
    pub fn connected(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Place a player in a slot.
    pub fn occupy(&mut self, slot: PlayerSlot, entry: PlayerEntry) -> Result<&mut PlayerEntry, SlotError> {
        let cell = self.slots.get_mut(slot.0).ok_or(SlotError::OutOfRange(slot))?;
        if cell.is_some() {
            return Err(SlotError::Occupied(slot));
        }
        Ok(cell.insert(entry))
    }

    /// Empty a slot, returning its player.
    pub fn vacate(&mut self, slot: PlayerSlot) -> Result<PlayerEntry, SlotError> {
        let cell = self.slots.get_mut(slot.0).ok_or(SlotError::OutOfRange(slot))?;
        cell.take().ok_or(SlotError::Empty(slot))
    }

    /// Player in a slot.
    pub fn get(&self, slot: PlayerSlot) -> Result<&PlayerEntry, SlotError> {
        self.slots
            .get(slot.0)
            .ok_or(SlotError::OutOfRange(slot))?
            .as_ref()
            .ok_or(SlotError::Empty(slot))
    }

    /// Player in a slot, mutably.
    pub fn get_mut(&mut self, slot: PlayerSlot) -> Result<&mut PlayerEntry, SlotError> {
        self.slots
            .get_mut(slot.0)
            .ok_or(SlotError::OutOfRange(slot))?
            .as_mut()
            .ok_or(SlotError::Empty(slot))
    }

    /// Current slot of a player, if still connected.
    pub fn find(&self, player: PlayerId) -> Option<PlayerSlot> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|e| e.player == player))
            .map(PlayerSlot)
    }

    /// Connected players in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerSlot, &PlayerEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|e| (PlayerSlot(i), e)))
    }

    /// Connected players in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerSlot, &mut PlayerEntry)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|e| (PlayerSlot(i), e)))
    }
}
