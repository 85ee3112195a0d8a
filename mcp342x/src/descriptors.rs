//! Bit-exact layout of the MCP342x configuration/status register.
//!
//! The chip has a single one-byte register, LSB to MSB:
//! `[gain:2][rate:2][mode:1][channel:2][ready:1]`. Encoding and decoding use
//! explicit shifts and masks so the on-wire layout never depends on struct
//! layout rules.

const GAIN_SHIFT: u8 = 0;
const RATE_SHIFT: u8 = 2;
const MODE_SHIFT: u8 = 4;
const CHANNEL_SHIFT: u8 = 5;
const READY_SHIFT: u8 = 7;
const FIELD_MASK: u8 = 0b11;

/// Raw field value outside its enumeration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidField;

/// Programmable gain amplifier setting.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
}

impl Gain {
    /// Masks `index` to the two-bit field width.
    pub const fn from_index(index: u8) -> Self {
        match index & FIELD_MASK {
            0 => Self::X1,
            1 => Self::X2,
            2 => Self::X4,
            _ => Self::X8,
        }
    }

    /// Amplification factor applied ahead of the converter.
    pub const fn multiplier(self) -> u8 {
        1 << (self as u8)
    }
}

impl TryFrom<u8> for Gain {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= FIELD_MASK {
            Ok(Self::from_index(value))
        } else {
            Err(InvalidField)
        }
    }
}

/// Conversion resolution, which also fixes the sample rate, the conversion
/// time and the length of the data read-back.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRate {
    /// 12 bits, 240 SPS
    #[default]
    Bits12 = 0,
    /// 14 bits, 60 SPS
    Bits14 = 1,
    /// 16 bits, 15 SPS
    Bits16 = 2,
    /// 18 bits, 3.75 SPS
    Bits18 = 3,
}

impl SampleRate {
    /// Masks `index` to the two-bit field width.
    pub const fn from_index(index: u8) -> Self {
        match index & FIELD_MASK {
            0 => Self::Bits12,
            1 => Self::Bits14,
            2 => Self::Bits16,
            _ => Self::Bits18,
        }
    }

    /// Worst-case conversion time in milliseconds, rounded up from the
    /// sample period (240 / 60 / 15 / 3.75 SPS).
    pub const fn conversion_delay_ms(self) -> u32 {
        match self {
            Self::Bits12 => 5,
            Self::Bits14 => 17,
            Self::Bits16 => 67,
            Self::Bits18 => 267,
        }
    }

    /// Length of the read-back for a conversion at this rate, including the
    /// echoed configuration byte. 18-bit results carry an extra data byte.
    pub const fn response_len(self) -> usize {
        match self {
            Self::Bits18 => 4,
            _ => 3,
        }
    }

    /// Resolution in bits.
    pub const fn bits(self) -> u8 {
        12 + (self as u8) * 2
    }
}

impl TryFrom<u8> for SampleRate {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= FIELD_MASK {
            Ok(Self::from_index(value))
        } else {
            Err(InvalidField)
        }
    }
}

/// One-shot vs continuous conversion.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    #[default]
    OneShot = 0,
    Continuous = 1,
}

/// Input channel select.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    #[default]
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
}

impl Channel {
    /// Masks `index` to the two-bit field width.
    pub const fn from_index(index: u8) -> Self {
        match index & FIELD_MASK {
            0 => Self::Ch0,
            1 => Self::Ch1,
            2 => Self::Ch2,
            _ => Self::Ch3,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= FIELD_MASK {
            Ok(Self::from_index(value))
        } else {
            Err(InvalidField)
        }
    }
}

/// The MCP342x configuration register.
///
/// Writing the byte with [`ready`](Self::ready) set selects the channel and
/// starts a conversion. The byte read back after the data bytes echoes the
/// triggering configuration; a cleared ready bit there means the data holds a
/// fresh result.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigRegister {
    pub gain: Gain,
    pub rate: SampleRate,
    pub mode: ConversionMode,
    pub channel: Channel,
    /// Write: 1 triggers a new conversion. Read: 1 means the conversion is
    /// still in progress and the data bytes repeat the previous result.
    pub ready: bool,
}

impl ConfigRegister {
    pub const fn encode(self) -> u8 {
        (self.gain as u8) << GAIN_SHIFT
            | (self.rate as u8) << RATE_SHIFT
            | (self.mode as u8) << MODE_SHIFT
            | (self.channel as u8) << CHANNEL_SHIFT
            | (self.ready as u8) << READY_SHIFT
    }

    /// Total over all 256 byte values; no field can fail to decode.
    pub const fn decode(byte: u8) -> Self {
        Self {
            gain: Gain::from_index(byte >> GAIN_SHIFT & FIELD_MASK),
            rate: SampleRate::from_index(byte >> RATE_SHIFT & FIELD_MASK),
            mode: if byte >> MODE_SHIFT & 1 == 0 {
                ConversionMode::OneShot
            } else {
                ConversionMode::Continuous
            },
            channel: Channel::from_index(byte >> CHANNEL_SHIFT & FIELD_MASK),
            ready: byte >> READY_SHIFT & 1 != 0,
        }
    }

    /// Copy of this configuration with the ready bit set, as written to the
    /// chip to start a conversion.
    pub const fn triggered(self) -> Self {
        Self {
            ready: true,
            ..self
        }
    }
}
