//! Diagnostic views over channels and devices.
//!
//! These are plain `Display` values; whatever reporting sink the system has
//! decides where the text goes.

use core::fmt;

use heapless::Vec;
use mcp342x::{Address, ConfigRegister};

use crate::registry::SenseMode;

/// One-line diagnostic view of a channel's stored configuration and last
/// value. Field names follow the chip's datasheet register names.
#[derive(Clone, Copy, Debug)]
pub struct ChannelReport {
    pub(crate) channel: u8,
    pub(crate) config: ConfigRegister,
    pub(crate) mode: SenseMode,
    pub(crate) value: f32,
}

impl fmt::Display for ChannelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cfg=0x{:02X} nRDY={} C={} OS_C={} SAMP={} PGA={} Mode={} L={} vNorm={}",
            self.config.encode(),
            self.config.ready as u8,
            self.config.channel.index(),
            self.config.mode as u8,
            self.config.rate as u8,
            self.config.gain as u8,
            self.mode,
            self.channel,
            self.value,
        )
    }
}

/// Per-channel diagnostic lines for one device.
#[derive(Clone, Debug)]
pub struct DeviceReport {
    pub(crate) address: Address,
    pub(crate) channels: Vec<ChannelReport, 4>,
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (local, channel) in self.channels.iter().enumerate() {
            writeln!(f, "#{} A=0x{:02X} {}", local, self.address as u8, channel)?;
        }
        Ok(())
    }
}
