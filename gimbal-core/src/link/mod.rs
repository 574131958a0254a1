//! Link layer: framing over a transport and device discovery

pub mod codec;
pub mod discovery;

pub use codec::{FrameCodec, SendError, MAX_DRAIN_PER_PASS};
pub use discovery::{
    Discovery, DiscoveryEvent, DiscoveryState, DiscoveryStep, DISCOVERY_STEP_MS,
};
