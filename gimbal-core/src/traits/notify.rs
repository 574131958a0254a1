//! Operator notifications

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    Error,
    Warning,
    Notice,
    Info,
}

/// Sink for operator text messages
pub trait NotificationSink {
    /// Queue a text message for the ground station
    fn send_text(&mut self, severity: Severity, text: &str);

    /// Whether a ground station has been seen
    ///
    /// State notices are held back until this returns true.
    fn gcs_connected(&self) -> bool;
}
