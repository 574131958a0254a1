//! Device discovery
//!
//! Before normal operation the gimbal has to be found. Over serial the link
//! alternates between sending a version request and looking for the answer,
//! one step every [`DISCOVERY_STEP_MS`]. Over the bus no request is sent;
//! the first status broadcast is enough.
//!
//! An optional search limit moves the link to [`DiscoveryState::Disabled`]
//! for the rest of the run.

/// Interval between serial discovery steps
pub const DISCOVERY_STEP_MS: u64 = 100;

/// Discovery states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryState {
    /// Looking for the gimbal
    #[default]
    Searching,
    /// Gimbal found; normal operation
    Initialised,
    /// Gave up or no channel; stays here until restart
    Disabled,
}

/// Events that drive discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryEvent {
    /// Version response decoded on the serial link
    VersionReceived,
    /// Status broadcast seen on a ready bus
    BusStatusReceived,
    /// Search limit exceeded
    Timeout,
    /// No transport to talk over
    TransportMissing,
}

impl DiscoveryState {
    pub fn is_initialised(&self) -> bool {
        matches!(self, DiscoveryState::Initialised)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, DiscoveryState::Disabled)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: DiscoveryEvent) -> Self {
        use DiscoveryEvent::*;
        use DiscoveryState::*;

        match (self, event) {
            (Searching, VersionReceived) => Initialised,
            (Searching, BusStatusReceived) => Initialised,
            (Searching, Timeout) => Disabled,
            (Searching, TransportMissing) => Disabled,

            // Disabled is terminal and Initialised ignores late answers
            (state, _) => state,
        }
    }
}

/// Work the caller has to do for this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryStep {
    /// Nothing due
    Idle,
    /// Flush input and send a version request
    RequestVersion,
    /// Try to decode the version response
    AwaitVersion,
    /// The search limit was hit on this tick
    TimedOut,
}

/// Discovery sequencer
#[derive(Debug, Clone)]
pub struct Discovery {
    state: DiscoveryState,
    /// 0 disables the limit
    max_search_ms: u32,
    started_ms: Option<u64>,
    last_step_ms: Option<u64>,
    request_next: bool,
}

impl Discovery {
    pub fn new(max_search_ms: u32) -> Self {
        Self {
            state: DiscoveryState::Searching,
            max_search_ms,
            started_ms: None,
            last_step_ms: None,
            request_next: true,
        }
    }

    /// Discovery that can never succeed because there is no channel
    pub fn disabled() -> Self {
        let mut discovery = Self::new(0);
        discovery.handle(DiscoveryEvent::TransportMissing);
        discovery
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Apply an event
    ///
    /// Returns true if the event moved the state.
    pub fn handle(&mut self, event: DiscoveryEvent) -> bool {
        let next = self.state.transition(event);
        if next == self.state {
            return false;
        }
        debug!("discovery {} -> {}", self.state, next);
        self.state = next;
        true
    }

    /// Apply the search limit
    ///
    /// The limit is measured from the first call. Returns true on the tick
    /// that disables discovery.
    pub fn check_timeout(&mut self, now_ms: u64) -> bool {
        if self.state != DiscoveryState::Searching {
            return false;
        }
        let started = *self.started_ms.get_or_insert(now_ms);
        if self.max_search_ms == 0 || now_ms.saturating_sub(started) < u64::from(self.max_search_ms)
        {
            return false;
        }
        warn!("gimbal not found after {} ms, giving up", self.max_search_ms);
        self.handle(DiscoveryEvent::Timeout)
    }

    /// Advance the serial sequence
    ///
    /// Alternates between [`DiscoveryStep::RequestVersion`] and
    /// [`DiscoveryStep::AwaitVersion`], one step per interval. The first
    /// call steps immediately.
    pub fn poll(&mut self, now_ms: u64) -> DiscoveryStep {
        if self.check_timeout(now_ms) {
            return DiscoveryStep::TimedOut;
        }
        if self.state != DiscoveryState::Searching {
            return DiscoveryStep::Idle;
        }
        if let Some(last) = self.last_step_ms {
            if now_ms.saturating_sub(last) < DISCOVERY_STEP_MS {
                return DiscoveryStep::Idle;
            }
        }
        self.last_step_ms = Some(now_ms);

        let step = if self.request_next {
            DiscoveryStep::RequestVersion
        } else {
            DiscoveryStep::AwaitVersion
        };
        self.request_next = !self.request_next;
        step
    }
}
