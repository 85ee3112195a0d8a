//! Driver for the Microchip MCP3421/2/3/4 delta-sigma ADC family over the
//! `embedded-hal` async I2C traits.
//!
//! The chips share one ADC core between all input channels: a conversion is
//! started by writing the full configuration byte (which also selects the
//! channel), and the result becomes available after a resolution-dependent
//! conversion time. There is no way to sample two channels of one chip in
//! parallel.

#![cfg_attr(not(test), no_std)]

use embedded_hal_async::{delay::DelayNs, i2c::I2c};

pub mod descriptors;

pub use descriptors::{
    Channel, ConfigRegister, ConversionMode, Gain, InvalidField, SampleRate,
};

/// I2C address options, selected by the chip's address pin straps.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Address {
    #[default]
    A0 = 0x68,
    A1 = 0x69,
    A2 = 0x6A,
    A3 = 0x6B,
    A4 = 0x6C,
    A5 = 0x6D,
    A6 = 0x6E,
    A7 = 0x6F,
}

/// Family members and their channel counts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    Mcp3421,
    Mcp3422,
    Mcp3423,
    Mcp3424,
}

impl Variant {
    pub const fn channel_count(self) -> u8 {
        match self {
            Self::Mcp3421 => 1,
            Self::Mcp3422 | Self::Mcp3423 => 2,
            Self::Mcp3424 => 4,
        }
    }
}

pub struct Mcp342x<I2C> {
    i2c: I2C,
    address: Address,
}

impl<I2C> Mcp342x<I2C> {
    pub const fn new(i2c: I2C, address: Address) -> Self {
        Self { i2c, address }
    }

    pub const fn address(&self) -> Address {
        self.address
    }

    pub fn inner_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn into_inner(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Mcp342x<I2C>
where
    I2C: I2c,
{
    /// Writes `config` with the ready bit forced on, selecting the channel
    /// and starting a new conversion.
    pub async fn start_conversion(&mut self, config: ConfigRegister) -> Result<(), I2C::Error> {
        let byte = config.triggered().encode();

        #[cfg(feature = "defmt")]
        defmt::trace!("trigger {=u8:#x}", byte);
        #[cfg(feature = "log")]
        log::trace!("trigger {byte:#04x}");

        self.i2c.write(self.address as u8, &[byte]).await
    }

    /// Writes `config` as-is, without forcing a trigger. Used to enter
    /// continuous conversion mode.
    pub async fn write_config(&mut self, config: ConfigRegister) -> Result<(), I2C::Error> {
        self.i2c.write(self.address as u8, &[config.encode()]).await
    }

    /// Reads the result of a conversion that was triggered at `rate`.
    ///
    /// 18-bit conversions return three data bytes, lower resolutions two;
    /// either response ends with a byte echoing the triggering
    /// configuration. The read length must match the triggered rate or the
    /// data bytes will be misaligned.
    pub async fn read_conversion(&mut self, rate: SampleRate) -> Result<Sample, I2C::Error> {
        if let SampleRate::Bits18 = rate {
            let mut response = [0; 4];
            self.i2c.read(self.address as u8, &mut response).await?;
            let [high, mid, low, config] = response;
            Ok(Sample::from_parts(high, mid, low, config))
        } else {
            let mut response = [0; 3];
            self.i2c.read(self.address as u8, &mut response).await?;
            let [mid, low, config] = response;
            // Synthesize the high byte so 12..16-bit readings share the
            // 18-bit two's-complement interpretation.
            let high = if mid & 0x80 != 0 { 0xFF } else { 0x00 };
            Ok(Sample::from_parts(high, mid, low, config))
        }
    }

    /// Runs one full one-shot conversion: trigger, wait out the conversion
    /// time for the configured rate, read back the result.
    pub async fn one_shot(
        &mut self,
        config: ConfigRegister,
        delay: &mut impl DelayNs,
    ) -> Result<Sample, I2C::Error> {
        self.start_conversion(config).await?;
        delay.delay_ms(config.rate.conversion_delay_ms()).await;
        self.read_conversion(config.rate).await
    }
}

/// One conversion result together with its echoed configuration.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    raw: i32,
    config: ConfigRegister,
}

impl Sample {
    /// 15.625 µV per count: the LSB weight at 18-bit resolution and unity
    /// gain. The PGA setting is not divided out of [`voltage`](Self::voltage).
    pub const VOLTS_PER_LSB: f32 = 0.000015625;

    /// Assembles a sample from the two's-complement data bytes (MSB first)
    /// and the echoed configuration byte. Bit 7 of `high` is sign-extended
    /// into the upper byte of the result.
    pub const fn from_parts(high: u8, mid: u8, low: u8, config: u8) -> Self {
        let ext = if high & 0x80 != 0 { 0xFF } else { 0x00 };

        Self {
            raw: i32::from_be_bytes([ext, high, mid, low]),
            config: ConfigRegister::decode(config),
        }
    }

    pub const fn raw(&self) -> i32 {
        self.raw
    }

    /// The configuration echoed alongside the data bytes.
    pub const fn config(&self) -> ConfigRegister {
        self.config
    }

    /// True when the echoed ready flag says the conversion had not completed
    /// and the data bytes repeat the previous result.
    pub const fn is_stale(&self) -> bool {
        self.config.ready
    }

    pub fn voltage(&self) -> f32 {
        self.raw as f32 * Self::VOLTS_PER_LSB
    }
}
