//! HX711 24-bit load cell ADC driver
//!
//! The HX711 talks over two lines: PD_SCK (clock, driven by us) and DOUT
//! (data, driven by the chip). DOUT goes low once a conversion is latched,
//! then 24 clock pulses shift the result out MSB first and 1-3 extra pulses
//! select the channel and gain of the *next* conversion.
//!
//! Layers, bottom up:
//! - [`frame`]: bit shifting and frame assembly
//! - [`acquisition`]: readiness waits and averaged reads
//! - [`calibration`]: gain selection, tare, scale and unit conversion

use core::fmt::{Debug, Formatter};
use core::time::Duration;

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_timers::clock::Clock;
use embedded_timers::delay::Delay;

pub mod acquisition;
pub mod calibration;
pub mod frame;

#[cfg(test)]
mod sim;

pub use frame::{decode, BitOrder};

/// Default number of samples for averaged reads, tare and scale calibration
pub const DEFAULT_TIMES: u16 = 10;

/// Minimum hold time of each clock level
const CLOCK_HOLD: Duration = Duration::from_micros(1);

/// Clock high for longer than this puts the chip into power-down mode
const POWER_DOWN_HOLD: Duration = Duration::from_micros(60);

/// HX711 channel and gain
///
/// The discriminant is the number of clock pulses sent after a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelGain {
    /// Channel: A, Gain: 128
    /// - Send one pulse
    #[default]
    ChannelA128 = 1,
    /// Channel: B, Gain: 32
    /// - Send two pulses
    ChannelB32 = 2,
    /// Channel: A, Gain: 64
    /// - Send three pulses
    ChannelA64 = 3,
}

impl ChannelGain {
    /// Map an amplification factor (128, 64 or 32) to its channel/gain selection
    pub fn from_gain(gain: u8) -> Option<Self> {
        match gain {
            128 => Some(Self::ChannelA128),
            64 => Some(Self::ChannelA64),
            32 => Some(Self::ChannelB32),
            _ => None,
        }
    }

    /// Amplification factor
    pub fn gain(self) -> u8 {
        match self {
            Self::ChannelA128 => 128,
            Self::ChannelB32 => 32,
            Self::ChannelA64 => 64,
        }
    }

    /// Number of trailing clock pulses that select this channel/gain
    pub fn pulses(self) -> u8 {
        self as u8
    }
}

/// HX711 sensor Error
pub enum Error<IP: InputPin, OP: OutputPin> {
    /// Digital I/O input error
    Input(IP::Error),
    /// Digital I/O output error
    Output(OP::Error),
    /// Sensor not ready
    NotReady,
    /// An average over zero samples was requested
    NoSamples,
    /// Unsupported gain factor
    InvalidGain(u8),
    /// Reference weight is zero or not finite, or it produced no usable scale
    InvalidReference,
}

impl<IP, OP> Debug for Error<IP, OP>
where
    IP: InputPin,
    IP::Error: Debug,
    OP: OutputPin,
    OP::Error: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Input(err) => write!(f, "The HX711 data signal input is incorrect, {:?}", err),
            Self::Output(err) => write!(f, "The HX711 clock signal output is incorrect, {:?}", err),
            Self::NotReady => write!(f, "The HX711 sensor is not ready."),
            Self::NoSamples => write!(f, "At least one HX711 sample is required."),
            Self::InvalidGain(gain) => {
                write!(f, "The HX711 does not support a gain of {}, use 128, 64 or 32.", gain)
            }
            Self::InvalidReference => {
                write!(f, "The HX711 reference weight must be a finite, non-zero value.")
            }
        }
    }
}

#[cfg(feature = "std")]
impl<IP: InputPin, OP: OutputPin> std::fmt::Display for Error<IP, OP> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(self, f)
    }
}

#[cfg(feature = "std")]
impl<IP: InputPin, OP: OutputPin> std::error::Error for Error<IP, OP> {}

/// HX711 Sensor Driver
///
/// One handle owns one physical device. The handle is not synchronized;
/// wrap it in a mutex if several execution contexts share the device.
pub struct Driver<'a, C: Clock, I: InputPin, O: OutputPin> {
    /// Clock used GPIO pin (PD_SCK)
    clock_pin: O,
    /// Data used GPIO pin (DOUT)
    data_pin: I,
    /// Channel and Gain config
    channel_gain: ChannelGain,
    /// Raw reading that represents zero load
    offset: f64,
    /// Divisor from zero-adjusted raw reading to physical units
    scale: f64,
    /// External clock implementation
    clock_impl: &'a C,
    /// Delay implementation for embedded_timers
    delay_impl: Delay<'a, C>,
}

impl<'a, C: Clock, I: InputPin, O: OutputPin> Driver<'a, C, I, O> {
    /// Create an instance of the HX711 sensor driver
    ///
    /// No frame is read, the selected channel/gain takes effect after the next read.
    pub fn new(
        clock: &'a C,
        mut clock_pin: O,
        data_pin: I,
        channel_gain: ChannelGain,
    ) -> Result<Self, O::Error> {
        // 拉低时钟信号电平，使芯片上电
        clock_pin.set_low()?;
        // OK
        Ok(Self {
            clock_pin,
            data_pin,
            channel_gain,
            offset: 0.0,
            scale: 1.0,
            clock_impl: clock,
            delay_impl: Delay::new(clock),
        })
    }

    /// Bind the pins and apply channel A, gain 128 immediately
    ///
    /// Blocks until the chip delivers its first frame.
    pub fn begin(clock: &'a C, clock_pin: O, data_pin: I) -> Result<Self, Error<I, O>> {
        let mut this = Self::new(clock, clock_pin, data_pin, ChannelGain::ChannelA128)
            .map_err(Error::Output)?;
        this.set_gain(128)?;
        Ok(this)
    }

    /// Check if the HX711 sensor is ready
    pub fn is_ready(&mut self) -> Result<bool, I::Error> {
        // 当DATA引脚为高电平时，表示数据未就绪
        // 一旦为低电平，表示数据就绪，可以读取数据
        self.data_pin.is_low()
    }

    /// Currently selected channel and gain
    pub fn channel_gain(&self) -> ChannelGain {
        self.channel_gain
    }

    /// Current zero offset (raw units)
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Current scale divisor (raw units per physical unit)
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Put the HX711 into power-down mode
    pub fn power_down(&mut self) -> Result<(), O::Error> {
        // 时钟引脚保持60微秒以上即可使HX711芯片断电
        self.clock_pin.set_high()?;
        self.delay_impl.delay(POWER_DOWN_HOLD);
        Ok(())
    }

    /// Wake the HX711 up
    ///
    /// The chip restarts on channel A, gain 128. The stored selection is
    /// committed again by the trailing pulses of the next read.
    pub fn power_up(&mut self) -> Result<(), O::Error> {
        // 将时钟信号设为低电平，HX711芯片上电
        self.clock_pin.set_low()
    }

    /// Reset HX711 sensor
    pub fn reset(&mut self) -> Result<(), O::Error> {
        // 断电再上电即可实现重置
        self.power_down()?;
        self.power_up()
    }
}
