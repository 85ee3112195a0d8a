//! Acquisition layer for boards carrying one or more MCP342x ADCs on a
//! shared I2C bus.
//!
//! Each chip samples one channel at a time and must be re-triggered with a
//! full configuration byte before every conversion. This crate maps a flat
//! logical channel space onto the registered devices, serializes conversions
//! at device granularity, runs the timed trigger-delay-read pipeline and
//! stores the scaled result per channel. The bus transport, the executor and
//! the command parser sit outside; their seams are the `embedded-hal` async
//! traits and the public API.

#![cfg_attr(not(test), no_std)]

use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use heapless::Vec;
use log::{debug, trace, warn};
use mcp342x::{Gain, Mcp342x, SampleRate, Variant};

mod registry;
pub mod report;

pub use registry::{Phase, SenseMode};

use registry::Registry;
use report::{ChannelReport, DeviceReport};

/// Errors surfaced by the acquisition layer.
///
/// Transport errors are propagated verbatim; nothing here retries or queues.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error<E> {
    /// Logical channel outside every device's range. A configuration error,
    /// not a transient fault.
    ChannelNotFound,
    /// Mode, rate or gain outside its enumeration.
    InvalidParameter,
    /// A conversion is already in flight on the owning device.
    DeviceBusy,
    /// Bus write or read failed.
    Transfer(E),
    /// Device or channel table capacity exhausted during setup.
    TableFull,
}

/// A set of MCP342x devices sharing one logical channel space.
///
/// `MAX_DEVICES` and `MAX_CHANNELS` bound the tables; both are fixed at
/// construction time and registration fails with [`Error::TableFull`] once
/// either is exhausted.
pub struct AdcHub<I2C, const MAX_DEVICES: usize = 4, const MAX_CHANNELS: usize = 16> {
    adcs: Vec<Mcp342x<I2C>, MAX_DEVICES>,
    registry: Registry<MAX_DEVICES, MAX_CHANNELS>,
}

impl<I2C, const MAX_DEVICES: usize, const MAX_CHANNELS: usize>
    AdcHub<I2C, MAX_DEVICES, MAX_CHANNELS>
{
    pub const fn new() -> Self {
        Self {
            adcs: Vec::new(),
            registry: Registry::new(),
        }
    }
}

impl<I2C, const MAX_DEVICES: usize, const MAX_CHANNELS: usize> Default
    for AdcHub<I2C, MAX_DEVICES, MAX_CHANNELS>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I2C, const MAX_DEVICES: usize, const MAX_CHANNELS: usize>
    AdcHub<I2C, MAX_DEVICES, MAX_CHANNELS>
where
    I2C: I2c,
{
    /// Registers a device and assigns it the next contiguous block of
    /// logical channels. Returns the device index.
    pub fn add_device(
        &mut self,
        adc: Mcp342x<I2C>,
        variant: Variant,
    ) -> Result<usize, Error<I2C::Error>> {
        if self.adcs.is_full() {
            return Err(Error::TableFull);
        }

        let device = self
            .registry
            .add_device(variant.channel_count())
            .ok_or(Error::TableFull)?;

        let (lo, hi) = self.registry.range(device);
        debug!(
            "device {device}: {variant:?} at 0x{:02X}, channels {lo}..={hi}",
            adc.address() as u8
        );

        // Cannot fail, the registry shares the device capacity bound.
        self.adcs.push(adc).map_err(|_| Error::TableFull)?;

        Ok(device)
    }

    /// Runs one conversion cycle on a logical channel and stores the scaled
    /// result.
    ///
    /// The sequence is strictly trigger, delay, read: the channel's
    /// configuration byte is written (selecting the input and starting a
    /// one-shot conversion), the conversion time for the configured rate is
    /// waited out, then the result is read back, sign-extended and scaled.
    ///
    /// Only one conversion per device may be in flight; a call while the
    /// owning device is busy fails with [`Error::DeviceBusy`] without
    /// touching the chip. A transport failure propagates verbatim and leaves
    /// the device busy in its current phase.
    pub async fn sense(
        &mut self,
        channel: u8,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<I2C::Error>> {
        let device = self
            .registry
            .device_for(channel)
            .ok_or(Error::ChannelNotFound)?;

        if self.registry.is_busy(device) {
            return Err(Error::DeviceBusy);
        }

        let config = self.registry.config(channel);

        self.registry.set_busy(device, true);
        self.registry.set_phase(device, Phase::Triggered);
        trace!(
            "ch {channel}: trigger 0x{:02X}",
            config.triggered().encode()
        );
        self.adcs[device]
            .start_conversion(config)
            .await
            .map_err(Error::Transfer)?;

        self.registry.set_phase(device, Phase::Delaying);
        delay.delay_ms(config.rate.conversion_delay_ms()).await;

        self.registry.set_phase(device, Phase::ReadPending);
        let sample = self.adcs[device]
            .read_conversion(config.rate)
            .await
            .map_err(Error::Transfer)?;

        self.registry.set_busy(device, false);
        self.registry.set_phase(device, Phase::Idle);

        if sample.is_stale() {
            warn!("ch {channel}: conversion incomplete, data repeats the previous result");
        }

        let volts = sample.voltage();
        trace!("ch {channel}: raw={} -> {volts} V", sample.raw());
        self.registry.set_value(channel, volts);

        Ok(volts)
    }

    /// Applies mode, rate and gain to every channel in `start..=end`.
    ///
    /// The raw parameter values come from the command layer and are
    /// validated up front. The per-channel updates are best-effort: updates
    /// applied before an unmapped index is hit are not rolled back.
    pub fn configure_range(
        &mut self,
        start: u8,
        end: u8,
        mode: u8,
        rate: u8,
        gain: u8,
    ) -> Result<(), Error<I2C::Error>> {
        let mode = SenseMode::try_from(mode).map_err(|_| Error::InvalidParameter)?;
        let rate = SampleRate::try_from(rate).map_err(|_| Error::InvalidParameter)?;
        let gain = Gain::try_from(gain).map_err(|_| Error::InvalidParameter)?;

        for channel in start..=end {
            let device = self
                .registry
                .device_for(channel)
                .ok_or(Error::ChannelNotFound)?;

            self.registry.set_gain_rate(channel, gain, rate);
            self.registry.set_mode(device, channel, mode);
        }

        Ok(())
    }

    /// Last stored scaled value of a channel, 0.0 before its first
    /// conversion.
    pub fn scaled_value(&self, channel: u8) -> Result<f32, Error<I2C::Error>> {
        self.registry
            .device_for(channel)
            .ok_or(Error::ChannelNotFound)?;

        Ok(self.registry.value(channel))
    }

    /// Busy state of the device owning `channel`.
    pub fn is_busy(&self, channel: u8) -> Result<bool, Error<I2C::Error>> {
        self.registry
            .device_for(channel)
            .ok_or(Error::ChannelNotFound)?;

        Ok(self.registry.channel_busy(channel))
    }

    /// Diagnostic view of one channel.
    pub fn describe_channel(&self, channel: u8) -> Result<ChannelReport, Error<I2C::Error>> {
        let device = self
            .registry
            .device_for(channel)
            .ok_or(Error::ChannelNotFound)?;

        Ok(ChannelReport {
            channel,
            config: self.registry.config(channel),
            mode: self.registry.mode(device, channel),
            value: self.registry.value(channel),
        })
    }

    /// Diagnostic view of one device, or `None` for an unknown index.
    pub fn describe_device(&self, device: usize) -> Option<DeviceReport> {
        if device >= self.registry.device_count() {
            return None;
        }

        let (lo, hi) = self.registry.range(device);
        let mut channels = Vec::new();
        for channel in lo..=hi {
            channels
                .push(ChannelReport {
                    channel,
                    config: self.registry.config(channel),
                    mode: self.registry.mode(device, channel),
                    value: self.registry.value(channel),
                })
                .ok()?;
        }

        Some(DeviceReport {
            address: self.adcs[device].address(),
            channels,
        })
    }

    /// Diagnostic views of every registered device, in registration order.
    pub fn describe_all(&self) -> impl Iterator<Item = DeviceReport> + '_ {
        (0..self.registry.device_count()).filter_map(|device| self.describe_device(device))
    }

    pub fn device_count(&self) -> usize {
        self.registry.device_count()
    }

    /// Total number of logical channels across all devices.
    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    /// Pipeline phase of a device, for diagnostics and tests.
    pub fn device_phase(&self, device: usize) -> Option<Phase> {
        (device < self.registry.device_count()).then(|| self.registry.phase(device))
    }
}
