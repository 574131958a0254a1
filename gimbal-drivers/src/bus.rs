//! Shared-bus transport
//!
//! Frames are handed to the bus driver as node-specific payloads; the bus
//! driver owns arbitration and has no way to report backpressure, so every
//! write counts as fully accepted. Status broadcasts from the gimbal arrive
//! on the bus task, go through the [`StatusRegistry`] and land in a
//! [`StatusInbox`] this transport reads from.
//!
//! ```ignore
//! static INBOX: StatusInbox<CriticalSectionRawMutex> = StatusInbox::new();
//!
//! register_inbox(&registry, &INBOX, config.bus_node_id)?;
//! let link = BusLink::new(can_tx, &INBOX, config.bus_node_id);
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use gimbal_core::bus::{BusStatus, RegistryError, StatusInbox, StatusRegistry};
use gimbal_core::traits::{Priority, Transport, TransportKind};

/// Transmit space reported to the codec; the bus has no real figure
pub const BUS_TX_SPACE: usize = 1000;

/// Outgoing side of a bus driver
pub trait BusTx {
    /// Whether the bus interface is up
    fn is_ready(&self) -> bool;

    /// Queue a payload addressed to `node_id`
    ///
    /// Returns false if the driver dropped it.
    fn send(&mut self, node_id: u8, payload: &[u8], priority: Priority) -> bool;
}

/// Bus transport
pub struct BusLink<'a, B: BusTx, M: RawMutex> {
    tx: B,
    inbox: &'a StatusInbox<M>,
    node_id: u8,
}

impl<'a, B: BusTx, M: RawMutex> BusLink<'a, B, M> {
    pub fn new(tx: B, inbox: &'a StatusInbox<M>, node_id: u8) -> Self {
        Self { tx, inbox, node_id }
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }
}

impl<B: BusTx, M: RawMutex> Transport for BusLink<'_, B, M> {
    fn kind(&self) -> TransportKind {
        TransportKind::Bus
    }

    /// Best effort: always reports every byte as accepted
    fn write(&mut self, bytes: &[u8], priority: Priority) -> usize {
        if !self.tx.send(self.node_id, bytes, priority) {
            trace!("bus driver dropped {} bytes", bytes.len());
        }
        bytes.len()
    }

    fn space_remaining(&self) -> usize {
        BUS_TX_SPACE
    }

    fn available(&self) -> usize {
        0
    }

    fn read(&mut self) -> Option<u8> {
        None
    }

    fn is_ready(&self) -> bool {
        self.tx.is_ready()
    }

    fn take_status(&mut self) -> Option<BusStatus> {
        self.inbox.take()
    }
}

/// Bind `inbox` to status broadcasts from `node_id`
///
/// Returns the listener slot. Fails with [`RegistryError::Busy`] if another
/// task holds the registry; retry on a later cycle.
pub fn register_inbox<'a, R, M, const IDS: usize, const LISTENERS: usize>(
    registry: &StatusRegistry<'a, R, IDS, LISTENERS>,
    inbox: &'a StatusInbox<M>,
    node_id: u8,
) -> Result<u8, RegistryError>
where
    R: RawMutex,
    M: RawMutex + Sync + 'a,
{
    registry.register(inbox, node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
    use heapless::Vec;

    #[derive(Default)]
    struct CanTx {
        ready: bool,
        accept: bool,
        sent: Vec<(u8, usize), 8>,
    }

    impl BusTx for CanTx {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn send(&mut self, node_id: u8, payload: &[u8], _priority: Priority) -> bool {
            if self.accept {
                self.sent.push((node_id, payload.len())).unwrap();
            }
            self.accept
        }
    }

    #[test]
    fn test_write_is_best_effort() {
        let inbox = StatusInbox::<NoopRawMutex>::new();
        let mut link = BusLink::new(CanTx::default(), &inbox, 71);

        // Dropped by the driver, still reported as accepted
        assert_eq!(link.write(&[0; 11], Priority::Normal), 11);
        assert_eq!(link.space_remaining(), BUS_TX_SPACE);
        assert_eq!(link.available(), 0);
        assert_eq!(link.read(), None);
        assert!(!link.is_ready());
    }

    #[test]
    fn test_write_addresses_node() {
        let inbox = StatusInbox::<NoopRawMutex>::new();
        let tx = CanTx {
            ready: true,
            accept: true,
            ..Default::default()
        };
        let mut link = BusLink::new(tx, &inbox, 71);
        link.write(&[0; 7], Priority::Highest);
        assert_eq!(link.tx.sent.as_slice(), &[(71, 7)]);
    }

    #[test]
    fn test_status_reaches_link_through_registry() {
        let inbox = StatusInbox::<CriticalSectionRawMutex>::new();
        let registry: StatusRegistry<'_, NoopRawMutex, 4, 4> = StatusRegistry::new();
        assert_eq!(register_inbox(&registry, &inbox, 71), Ok(1));

        let mut link = BusLink::new(CanTx::default(), &inbox, 71);
        assert_eq!(link.take_status(), None);

        let status = BusStatus {
            mode: 3,
            ..Default::default()
        };
        assert_eq!(registry.publish(71, status), Ok(1));
        // Other nodes are not delivered
        assert_eq!(registry.publish(72, BusStatus::default()), Ok(0));

        assert_eq!(link.take_status(), Some(status));
        assert_eq!(link.take_status(), None);
    }
}
