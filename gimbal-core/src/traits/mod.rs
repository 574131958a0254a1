//! Collaborator traits
//!
//! These traits define the interface between the link engine and the rest
//! of the vehicle: the byte channel to the gimbal, the navigation and input
//! sources, and the operator message sink.

pub mod notify;
pub mod transport;
pub mod vehicle;

pub use notify::{NotificationSink, Severity};
pub use transport::{Priority, Transport, TransportKind};
pub use vehicle::{Angles, AttitudeSource, GpsFix, Location, PositionSource, RcInput, Vehicle};
