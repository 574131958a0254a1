//! Monotonic time source
//!
//! The engine never reads a wall clock on its own. Boards hand in a `Clock`
//! backed by their system timer; tests hand in [`crate::mock::MockClock`] and
//! step time explicitly.

/// Monotonic millisecond time source
pub trait Clock {
    /// Milliseconds since system start
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `reference_ms`
    ///
    /// Saturates to zero if `reference_ms` lies in the future.
    fn elapsed_since(&self, reference_ms: u64) -> u64 {
        self.now_ms().saturating_sub(reference_ms)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
