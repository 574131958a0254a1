//! Shared-bus plumbing
//!
//! When the gimbal sits on a broadcast bus, its status messages are received
//! by a bus task outside this engine and fanned out through a
//! [`BusListenerRegistry`]. The engine's transport listens through a
//! [`StatusInbox`].

pub mod registry;
pub mod status;

pub use registry::{BusListener, BusListenerRegistry, RegistryError};
pub use status::{BusStatus, StatusInbox};

/// Registry of gimbal status listeners keyed by node id
///
/// Listeners are `Sync` so that, with a `Sync` raw mutex, the registry can
/// live in a `static` shared by the bus task and the link engine.
pub type StatusRegistry<'a, M, const IDS: usize, const LISTENERS: usize> = BusListenerRegistry<
    'a,
    M,
    dyn BusListener<BusStatus> + Sync + 'a,
    BusStatus,
    IDS,
    LISTENERS,
>;
