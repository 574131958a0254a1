//! Shared fixtures for the link integration tests

#![allow(dead_code)]

use gimbal_core::traits::{
    Angles, AttitudeSource, GpsFix, Location, NotificationSink, PositionSource, RcInput, Severity,
};
use gimbal_protocol::{Frame, FrameParser, StartFilter};

/// Flight stack stand-in
pub struct TestVehicle {
    pub channels: [Option<u16>; 16],
    pub fix: GpsFix,
    pub location: Option<Location>,
    pub armed: bool,
}

impl Default for TestVehicle {
    fn default() -> Self {
        Self {
            channels: [Some(1500); 16],
            fix: GpsFix::Fix3D,
            location: None,
            armed: false,
        }
    }
}

impl AttitudeSource for TestVehicle {
    fn quaternion(&self) -> [f32; 4] {
        [1.0, 0.0, 0.0, 0.0]
    }

    fn velocity_ned(&self) -> Option<[f32; 3]> {
        None
    }

    fn ahrs_healthy(&self) -> bool {
        true
    }

    fn ahrs_initialised(&self) -> bool {
        true
    }

    fn horizontal_velocity_valid(&self) -> bool {
        true
    }

    fn armed(&self) -> bool {
        self.armed
    }
}

impl PositionSource for TestVehicle {
    fn gps_fix(&self) -> GpsFix {
        self.fix
    }

    fn location(&self) -> Option<Location> {
        self.location
    }
}

impl RcInput for TestVehicle {
    fn channel(&self, index: usize) -> Option<u16> {
        self.channels.get(index).copied().flatten()
    }

    fn stabilized_target(&self) -> Angles {
        Angles::ZERO
    }
}

/// Ground station stand-in recording every text
#[derive(Default)]
pub struct Gcs {
    pub connected: bool,
    pub texts: Vec<(Severity, String)>,
}

impl Gcs {
    pub fn connected() -> Self {
        Self {
            connected: true,
            texts: Vec::new(),
        }
    }

    pub fn take(&mut self) -> Vec<String> {
        self.texts.drain(..).map(|(_, text)| text).collect()
    }
}

impl NotificationSink for Gcs {
    fn send_text(&mut self, severity: Severity, text: &str) {
        self.texts.push((severity, text.into()));
    }

    fn gcs_connected(&self) -> bool {
        self.connected
    }
}

/// Split a byte stream into the frames it carries
pub fn frames(bytes: &[u8]) -> Vec<Frame> {
    let mut parser = FrameParser::with_filter(StartFilter::Any);
    let mut out = Vec::new();
    for &byte in bytes {
        if parser.feed(byte).expect("well-formed stream") {
            out.extend(parser.take_frame());
            parser.reset();
        }
    }
    out
}

/// Command codes of the frames in `bytes`
pub fn codes(bytes: &[u8]) -> Vec<u8> {
    frames(bytes).iter().map(|f| f.command).collect()
}
