//! Gimbal status broadcast received over the bus

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::registry::BusListener;

/// Unsolicited status broadcast from the gimbal
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStatus {
    /// Gimbal operating mode
    pub mode: u8,
    /// Camera attitude quaternion in frame 0 (x, y, z, w)
    pub quaternion: [f32; 4],
    pub roll_rad: f32,
    pub pitch_rad: f32,
    pub yaw_rad: f32,
}

/// Single-entry mailbox for the latest bus status
///
/// Registered as a listener on the bus registry. The bus receive task
/// writes into it and the link engine takes from it; a newer status
/// overwrites one that has not been taken yet.
pub struct StatusInbox<M: RawMutex> {
    latest: Mutex<M, Cell<Option<BusStatus>>>,
}

impl<M: RawMutex> StatusInbox<M> {
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(Cell::new(None)),
        }
    }

    /// Take the pending status, if any
    pub fn take(&self) -> Option<BusStatus> {
        self.latest.lock(|cell| cell.take())
    }

    /// True if a status is waiting
    pub fn is_pending(&self) -> bool {
        self.latest.lock(|cell| cell.get().is_some())
    }
}

impl<M: RawMutex> Default for StatusInbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> BusListener<BusStatus> for StatusInbox<M> {
    fn handle(&self, value: &BusStatus) {
        self.latest.lock(|cell| cell.set(Some(*value)));
    }
}
