//! Gimbal device
//!
//! Ties transport, discovery, scheduling, targeting and telemetry together
//! behind one [`Gimbal::tick`] the flight-control loop calls at a high rate.
//!
//! ```text
//! tick ─┬─ Searching ──► discovery step (serial: request/await, bus: status)
//!       ├─ Initialised ─► operator notices, then one task slot
//!       └─ Disabled ────► nothing
//! ```

use core::fmt::Write as _;

use gimbal_hal::Clock;
use gimbal_protocol::commands::{CAMERA_TRIGGER_PICTURE, INPUT_CHANNELS, INPUT_CHANNEL_MAX, LOCATION_VALID};
use gimbal_protocol::{
    Command, LinkStatus, LinkStatusFlags, LiveData, LiveFields, LocationPayload, VersionInfo,
};
use heapless::String;

use crate::config::{FeatureMask, MountConfig, MountMode};
use crate::link::{Discovery, DiscoveryEvent, DiscoveryState, DiscoveryStep, FrameCodec, SendError};
use crate::scheduler::{Scheduler, TaskSlot};
use crate::target::{TargetCommand, TargetResolver};
use crate::telemetry::{DeviceStatus, MountStatus, TelemetryCache};
use crate::traits::{
    Angles, AttitudeSource, GpsFix, Location, NotificationSink, PositionSource, Priority, RcInput,
    Severity, Transport, TransportKind, Vehicle,
};

/// Longest operator text line
const TEXT_CAPACITY: usize = 64;

/// Link engine for one gimbal
pub struct Gimbal<T: Transport, C: Clock> {
    transport: Option<T>,
    clock: C,
    config: MountConfig,
    codec: FrameCodec,
    discovery: Discovery,
    scheduler: Scheduler,
    resolver: TargetResolver,
    telemetry: TelemetryCache,
    version: Option<VersionInfo>,
    status_seq: u8,
    camera_pending: bool,
    banner_pending: bool,
}

impl<T: Transport, C: Clock> Gimbal<T, C> {
    /// Create the engine
    ///
    /// Without a transport the device starts disabled and stays that way.
    pub fn new(transport: Option<T>, clock: C, config: MountConfig) -> Self {
        let discovery = match &transport {
            Some(_) => Discovery::new(config.max_search_ms),
            None => {
                warn!("no gimbal transport, mount disabled");
                Discovery::disabled()
            }
        };
        let resolver = TargetResolver::new(&config);

        Self {
            transport,
            clock,
            config,
            codec: FrameCodec::new(),
            discovery,
            scheduler: Scheduler::new(),
            resolver,
            telemetry: TelemetryCache::new(),
            version: None,
            status_seq: 0,
            camera_pending: false,
            banner_pending: false,
        }
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    pub fn discovery_state(&self) -> DiscoveryState {
        self.discovery.state()
    }

    pub fn is_initialised(&self) -> bool {
        self.discovery.state().is_initialised()
    }

    /// Channel in use, `None` once disabled
    pub fn transport_kind(&self) -> TransportKind {
        if self.discovery.state().is_disabled() {
            return TransportKind::None;
        }
        self.transport
            .as_ref()
            .map_or(TransportKind::None, |t| t.kind())
    }

    /// Firmware identification captured during serial discovery
    pub fn version(&self) -> Option<&VersionInfo> {
        self.version.as_ref()
    }

    pub fn mode(&self) -> MountMode {
        self.resolver.mode()
    }

    /// Change the pointing mode
    ///
    /// Ignored until the gimbal has been found.
    pub fn set_mode(&mut self, mode: MountMode) {
        if !self.is_initialised() {
            return;
        }
        self.resolver.set_mode(mode);
    }

    /// Earth-frame target for [`MountMode::ExternalTarget`]
    pub fn set_external_target(&mut self, angles: Angles) {
        self.resolver.set_external_target(angles);
    }

    /// Point of interest for [`MountMode::PositionTarget`]
    pub fn set_roi(&mut self, roi: Location) {
        self.resolver.set_roi(roi);
    }

    /// Last resolved target
    pub fn target(&self) -> Option<&TargetCommand> {
        self.resolver.last_target()
    }

    /// Fire the camera on the next request slot
    pub fn trigger_camera(&mut self) {
        self.camera_pending = true;
    }

    /// Announce the gimbal to the operator on the next tick
    pub fn request_banner(&mut self) {
        self.banner_pending = true;
    }

    /// The gimbal reports normal operation
    pub fn is_armed(&self) -> bool {
        self.telemetry.is_armed()
    }

    /// Latest gimbal orientation
    pub fn device_status(&self) -> DeviceStatus {
        self.telemetry.status()
    }

    /// Latest orientation if it changed since the last call
    pub fn take_device_update(&mut self) -> Option<DeviceStatus> {
        self.telemetry.take_update()
    }

    /// Orientation for the ground-station mount status message
    pub fn mount_status(&self) -> MountStatus {
        self.telemetry.mount_status()
    }

    /// Tell the gimbal where home is
    pub fn send_home_location<P: PositionSource + ?Sized>(
        &mut self,
        position: &P,
    ) -> Result<usize, SendError> {
        let payload = match position.location() {
            Some(here) => location_payload(&here, LOCATION_VALID),
            None => LocationPayload::default(),
        };
        self.send(&Command::SetHomeLocation(payload), Priority::Normal)
    }

    /// Tell the gimbal where its target is
    pub fn send_target_location(&mut self, target: &Location) -> Result<usize, SendError> {
        let payload = location_payload(target, LOCATION_VALID);
        self.send(&Command::SetTargetLocation(payload), Priority::Normal)
    }

    /// Run one engine step
    ///
    /// Call from a periodic timer faster than 100 Hz. Never blocks.
    pub fn tick<V, N>(&mut self, vehicle: &V, notify: &mut N)
    where
        V: Vehicle + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let now_ms = self.clock.now_ms();

        match self.discovery.state() {
            DiscoveryState::Disabled => {}
            DiscoveryState::Searching => self.discover(now_ms),
            DiscoveryState::Initialised => {
                self.send_notices(notify);
                if let Some(slot) = self.scheduler.poll(now_ms) {
                    self.run_slot(slot, vehicle);
                }
            }
        }
    }

    fn send(&mut self, command: &Command, priority: Priority) -> Result<usize, SendError> {
        if self.discovery.state().is_disabled() {
            return Err(SendError::Unavailable);
        }
        let transport = self.transport.as_mut().ok_or(SendError::Unavailable)?;
        self.codec.send(transport, command, priority)
    }

    /// Send from a task slot; failures wait for the next cycle
    fn send_best_effort(&mut self, command: &Command, priority: Priority) {
        if let Err(err) = self.send(command, priority) {
            trace!("command {=u8:#x} skipped: {}", command.code(), err);
        }
    }

    fn discover(&mut self, now_ms: u64) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        if transport.kind() == TransportKind::Bus {
            if self.discovery.check_timeout(now_ms) {
                return;
            }
            if !transport.is_ready() {
                return;
            }
            if let Some(status) = transport.take_status() {
                self.telemetry.update_bus(&status);
                self.on_found(None);
            }
            return;
        }

        match self.discovery.poll(now_ms) {
            DiscoveryStep::RequestVersion => {
                self.codec.flush(transport);
                if let Err(err) = self.codec.send(transport, &Command::GetVersionStr, Priority::Normal)
                {
                    trace!("version request skipped: {}", err);
                }
            }
            DiscoveryStep::AwaitVersion => {
                let Some(frame) = self.codec.receive(transport) else {
                    return;
                };
                match VersionInfo::from_frame(&frame) {
                    Ok(version) => self.on_found(Some(version)),
                    Err(err) => debug!("unexpected answer during discovery: {}", err),
                }
            }
            DiscoveryStep::Idle | DiscoveryStep::TimedOut => {}
        }
    }

    fn on_found(&mut self, version: Option<VersionInfo>) {
        let event = if version.is_some() {
            DiscoveryEvent::VersionReceived
        } else {
            DiscoveryEvent::BusStatusReceived
        };
        if !self.discovery.handle(event) {
            return;
        }
        match &version {
            Some(v) => info!(
                "gimbal found: {=str} on {=str}",
                v.version.as_str(),
                v.board.as_str()
            ),
            None => info!("gimbal found on bus"),
        }
        self.version = version;
        self.scheduler.reset();
        self.banner_pending = true;
    }

    fn send_notices<N: NotificationSink + ?Sized>(&mut self, notify: &mut N) {
        if core::mem::take(&mut self.banner_pending) {
            notify.send_text(Severity::Info, "STorM32: found and initialized");
            if let Some(version) = &self.version {
                let mut line: String<TEXT_CAPACITY> = String::new();
                if write!(line, "STorM32: {}, {}", version.version, version.board).is_ok() {
                    notify.send_text(Severity::Info, &line);
                }
            }
            self.telemetry.request_armed_notice();
        }

        // Held back until someone is listening
        if !notify.gcs_connected() {
            return;
        }
        if self.telemetry.take_armed_notice() {
            let text = if self.telemetry.is_armed() {
                "STorM32: ARMED"
            } else {
                "STorM32: DISARMED"
            };
            notify.send_text(Severity::Info, text);
        }
    }

    fn run_slot<V: Vehicle + ?Sized>(&mut self, slot: TaskSlot, vehicle: &V) {
        let serial = self.transport_kind() == TransportKind::Serial;
        let features = self.config.features;

        match slot {
            TaskSlot::StatusBroadcast => {
                if features.contains(FeatureMask::SEND_STATUS_BROADCAST) {
                    let status = self.link_status(vehicle);
                    self.send_best_effort(&Command::LinkStatus(status), Priority::Highest);
                }
            }
            TaskSlot::RequestData => {
                if serial {
                    if let Some(transport) = self.transport.as_mut() {
                        self.codec.flush(transport);
                    }
                    self.send_best_effort(
                        &Command::GetDataFields {
                            flags: LiveFields::REQUEST,
                        },
                        Priority::Normal,
                    );
                }
                if core::mem::take(&mut self.camera_pending)
                    && features.contains(FeatureMask::SEND_CAMERA)
                {
                    self.send_best_effort(
                        &Command::DoCamera {
                            camera_cmd: CAMERA_TRIGGER_PICTURE,
                        },
                        Priority::Normal,
                    );
                }
            }
            TaskSlot::SendTarget => {
                let Some(target) = self.resolver.resolve(&self.config, vehicle) else {
                    return;
                };
                if let Some(command) = self.resolver.command_for(&target) {
                    self.send_best_effort(&command, Priority::Normal);
                }
            }
            TaskSlot::SendInputs => {
                if features.contains(FeatureMask::SEND_INPUTS) {
                    let command = Command::SetInputs {
                        channels: input_channels(vehicle),
                        status: 0,
                    };
                    self.send_best_effort(&command, Priority::Normal);
                }
            }
            TaskSlot::Receive => self.receive(),
        }
    }

    fn receive(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        if transport.kind() == TransportKind::Bus {
            if let Some(status) = transport.take_status() {
                self.telemetry.update_bus(&status);
            }
            return;
        }

        let Some(frame) = self.codec.receive(transport) else {
            return;
        };
        match LiveData::from_frame(&frame) {
            Ok(data) => {
                self.telemetry.update_live(&data);
            }
            Err(err) => debug!("live data dropped: {}", err),
        }
    }

    fn link_status<A: AttitudeSource + PositionSource + ?Sized>(&mut self, vehicle: &A) -> LinkStatus {
        let mut status = LinkStatusFlags::FLIGHT_STACK;
        status.set(LinkStatusFlags::AHRS_HEALTHY, vehicle.ahrs_healthy());
        status.set(LinkStatusFlags::AHRS_INITIALISED, vehicle.ahrs_initialised());
        status.set(LinkStatusFlags::GPS_3D_FIX, vehicle.gps_fix() >= GpsFix::Fix3D);
        status.set(LinkStatusFlags::NAV_HORIZ_VEL, vehicle.horizontal_velocity_valid());
        status.set(LinkStatusFlags::ARMED, vehicle.armed());

        let seq = self.status_seq;
        self.status_seq = self.status_seq.wrapping_add(1);

        LinkStatus {
            seq,
            status,
            yaw_rate: 0,
            quaternion: vehicle.quaternion(),
            velocity: vehicle.velocity_ned().unwrap_or([0.0; 3]),
        }
    }
}

fn location_payload(location: &Location, status: u16) -> LocationPayload {
    LocationPayload {
        latitude: location.lat,
        longitude: location.lng,
        altitude: location.alt_cm,
        status,
    }
}

fn input_channels<R: RcInput + ?Sized>(rc: &R) -> [u16; INPUT_CHANNELS] {
    core::array::from_fn(|i| rc.channel(i).unwrap_or(0).min(INPUT_CHANNEL_MAX))
}
