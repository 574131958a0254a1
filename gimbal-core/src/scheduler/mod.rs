//! Task-slot scheduler
//!
//! The host calls the link from a fast periodic timer. The scheduler
//! throttles that to one slot every [`SLOT_INTERVAL_MS`] and cycles through
//! the five slots, so each slot's work runs every 50 ms and no single tick
//! does more than one slot's worth of work.

/// Minimum time between two slots
pub const SLOT_INTERVAL_MS: u64 = 10;

/// Slots per cycle
pub const SLOT_COUNT: u8 = 5;

/// Work assigned to each slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskSlot {
    /// Flight-controller status broadcast
    StatusBroadcast,
    /// Live-data request and one-shot commands
    RequestData,
    /// Resolve and send the pointing target
    SendTarget,
    /// Forward RC inputs
    SendInputs,
    /// Decode incoming telemetry
    Receive,
}

impl TaskSlot {
    /// Slot for a cycle position, wrapping past the last slot
    pub const fn from_index(index: u8) -> Self {
        match index % SLOT_COUNT {
            0 => TaskSlot::StatusBroadcast,
            1 => TaskSlot::RequestData,
            2 => TaskSlot::SendTarget,
            3 => TaskSlot::SendInputs,
            _ => TaskSlot::Receive,
        }
    }

    pub const fn index(self) -> u8 {
        match self {
            TaskSlot::StatusBroadcast => 0,
            TaskSlot::RequestData => 1,
            TaskSlot::SendTarget => 2,
            TaskSlot::SendInputs => 3,
            TaskSlot::Receive => 4,
        }
    }
}

/// Self-throttling slot sequencer
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    index: u8,
    last_ms: Option<u64>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            index: 0,
            last_ms: None,
        }
    }

    /// Slot that runs next
    pub fn next_slot(&self) -> TaskSlot {
        TaskSlot::from_index(self.index)
    }

    /// Return the slot due at `now_ms`, if any, and advance past it
    ///
    /// The first call is always due.
    pub fn poll(&mut self, now_ms: u64) -> Option<TaskSlot> {
        if let Some(last) = self.last_ms {
            if now_ms.saturating_sub(last) < SLOT_INTERVAL_MS {
                return None;
            }
        }
        self.last_ms = Some(now_ms);

        let slot = self.next_slot();
        self.index = (self.index + 1) % SLOT_COUNT;
        Some(slot)
    }

    /// Restart the cycle at the first slot
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_run_in_order_and_wrap() {
        let mut scheduler = Scheduler::new();
        let mut seen = heapless::Vec::<TaskSlot, 12>::new();
        for n in 0..12u64 {
            seen.push(scheduler.poll(n * SLOT_INTERVAL_MS).unwrap()).unwrap();
        }
        for (n, slot) in seen.iter().enumerate() {
            assert_eq!(slot.index(), (n % 5) as u8);
        }
        assert_eq!(seen[5], TaskSlot::StatusBroadcast);
        assert_eq!(seen[4], TaskSlot::Receive);
    }

    #[test]
    fn test_throttles_fast_ticks() {
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.poll(1000), Some(TaskSlot::StatusBroadcast));
        for t in 1001..1010 {
            assert_eq!(scheduler.poll(t), None);
        }
        assert_eq!(scheduler.poll(1010), Some(TaskSlot::RequestData));
        // Late ticks do not try to catch up
        assert_eq!(scheduler.poll(1100), Some(TaskSlot::SendTarget));
        assert_eq!(scheduler.poll(1101), None);
    }

    #[test]
    fn test_reset_restarts_cycle() {
        let mut scheduler = Scheduler::new();
        scheduler.poll(0);
        scheduler.poll(10);
        scheduler.poll(20);
        assert_eq!(scheduler.next_slot(), TaskSlot::SendInputs);
        scheduler.reset();
        assert_eq!(scheduler.poll(30), Some(TaskSlot::StatusBroadcast));
    }

    #[test]
    fn test_index_roundtrip() {
        for n in 0..SLOT_COUNT {
            assert_eq!(TaskSlot::from_index(n).index(), n);
        }
        assert_eq!(TaskSlot::from_index(7), TaskSlot::SendTarget);
    }
}
