//! Device and channel bookkeeping.
//!
//! The registry owns the logical channel space: each registered device gets
//! the next contiguous block of channel indices, and every lookup resolves a
//! logical channel back to the device whose block contains it. Busy flags
//! are device-granular because the chip serializes conversions across all of
//! its channels.

use heapless::Vec;
use mcp342x::{Channel, ConfigRegister, Gain, InvalidField, SampleRate};

/// Where a device currently is in its conversion pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Configuration byte is being written.
    Triggered,
    /// Waiting out the conversion time.
    Delaying,
    /// Result read issued, not yet decoded.
    ReadPending,
}

/// What a channel is wired to measure. Stored as two bits per channel in the
/// owning device's mode bitmap.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SenseMode {
    Disabled = 0,
    #[default]
    Voltage = 1,
    Current = 2,
    Resistance = 3,
}

impl SenseMode {
    const fn from_index(index: u8) -> Self {
        match index & 0b11 {
            0 => Self::Disabled,
            1 => Self::Voltage,
            2 => Self::Current,
            _ => Self::Resistance,
        }
    }
}

impl TryFrom<u8> for SenseMode {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 0b11 {
            Ok(Self::from_index(value))
        } else {
            Err(InvalidField)
        }
    }
}

impl core::fmt::Display for SenseMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Disabled => "off",
            Self::Voltage => "V",
            Self::Current => "A",
            Self::Resistance => "R",
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct DeviceEntry {
    ch_lo: u8,
    ch_hi: u8,
    /// Two bits per local channel.
    modes: u8,
    phase: Phase,
}

#[derive(Clone, Copy, Debug)]
struct ChannelState {
    config: ConfigRegister,
    busy: bool,
    value: f32,
}

pub(crate) struct Registry<const MAX_DEVICES: usize, const MAX_CHANNELS: usize> {
    devices: Vec<DeviceEntry, MAX_DEVICES>,
    channels: Vec<ChannelState, MAX_CHANNELS>,
}

impl<const MAX_DEVICES: usize, const MAX_CHANNELS: usize> Registry<MAX_DEVICES, MAX_CHANNELS> {
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Assigns the next contiguous logical channel range to a new device and
    /// populates its channels with the default configuration (gain x1,
    /// 12-bit rate, voltage mode, channel select pre-baked). Returns `None`
    /// when either table is out of capacity.
    pub fn add_device(&mut self, channel_count: u8) -> Option<usize> {
        debug_assert!(matches!(channel_count, 1 | 2 | 4));

        if self.devices.is_full()
            || self.channels.len() + channel_count as usize > MAX_CHANNELS
        {
            return None;
        }

        let ch_lo = self.channels.len() as u8;
        let mut modes = 0;

        for local in 0..channel_count {
            let config = ConfigRegister {
                channel: Channel::from_index(local),
                ..Default::default()
            };
            self.channels
                .push(ChannelState {
                    config,
                    busy: false,
                    value: 0.0,
                })
                .ok()?;
            modes |= (SenseMode::default() as u8) << (2 * local);
        }

        let index = self.devices.len();
        self.devices
            .push(DeviceEntry {
                ch_lo,
                ch_hi: ch_lo + channel_count - 1,
                modes,
                phase: Phase::Idle,
            })
            .ok()?;

        Some(index)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Resolves a logical channel to the device whose range contains it.
    pub fn device_for(&self, channel: u8) -> Option<usize> {
        self.devices
            .iter()
            .position(|dev| dev.ch_lo <= channel && channel <= dev.ch_hi)
    }

    /// Inclusive logical channel range of a device.
    pub fn range(&self, device: usize) -> (u8, u8) {
        let dev = &self.devices[device];
        (dev.ch_lo, dev.ch_hi)
    }

    /// Flips the busy flag on every channel of the device.
    pub fn set_busy(&mut self, device: usize, busy: bool) {
        let (lo, hi) = self.range(device);
        for ch in lo..=hi {
            self.channels[ch as usize].busy = busy;
        }
    }

    /// Device-level busy state. The flag is identical across all channels of
    /// one device, so the first channel is representative.
    pub fn is_busy(&self, device: usize) -> bool {
        let (lo, _) = self.range(device);
        self.channels[lo as usize].busy
    }

    pub fn channel_busy(&self, channel: u8) -> bool {
        self.channels[channel as usize].busy
    }

    pub fn phase(&self, device: usize) -> Phase {
        self.devices[device].phase
    }

    pub fn set_phase(&mut self, device: usize, phase: Phase) {
        self.devices[device].phase = phase;
    }

    pub fn config(&self, channel: u8) -> ConfigRegister {
        self.channels[channel as usize].config
    }

    pub fn set_gain_rate(&mut self, channel: u8, gain: Gain, rate: SampleRate) {
        let config = &mut self.channels[channel as usize].config;
        config.gain = gain;
        config.rate = rate;
    }

    pub fn mode(&self, device: usize, channel: u8) -> SenseMode {
        let dev = &self.devices[device];
        let local = channel - dev.ch_lo;
        SenseMode::from_index(dev.modes >> (2 * local))
    }

    pub fn set_mode(&mut self, device: usize, channel: u8, mode: SenseMode) {
        let dev = &mut self.devices[device];
        let local = channel - dev.ch_lo;
        dev.modes = dev.modes & !(0b11 << (2 * local)) | (mode as u8) << (2 * local);
    }

    pub fn value(&self, channel: u8) -> f32 {
        self.channels[channel as usize].value
    }

    pub fn set_value(&mut self, channel: u8, value: f32) {
        self.channels[channel as usize].value = value;
    }
}
