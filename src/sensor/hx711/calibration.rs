//! Gain selection, tare and unit conversion
//!
//! A weight is `(average - offset) / scale`. [`Driver::tare`] captures the
//! offset with nothing on the load cell, [`Driver::set_scale`] derives the
//! scale from a known reference weight, in whatever unit that weight is given.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_timers::clock::Clock;

use super::{ChannelGain, Driver, Error, DEFAULT_TIMES};

impl<'a, C: Clock, I: InputPin, O: OutputPin> Driver<'a, C, I, O> {
    /// Select the gain factor (128, 64 or 32) and apply it with one read
    ///
    /// An unsupported factor keeps the current selection. Blocks until the
    /// chip is ready.
    pub fn set_gain(&mut self, gain: u8) -> Result<(), Error<I, O>> {
        if let Some(channel_gain) = ChannelGain::from_gain(gain) {
            self.channel_gain = channel_gain;
            #[cfg(feature = "defmt")]
            defmt::debug!("HX711 gain set to {}", channel_gain);
        }
        // 读取一次数据，通过末尾的脉冲让新的通道和增益立即生效
        self.clock_pin.set_low().map_err(Error::Output)?;
        self.read_raw()?;
        Ok(())
    }

    /// Like [`Driver::set_gain`], but rejects an unsupported factor
    pub fn try_set_gain(&mut self, gain: u8) -> Result<(), Error<I, O>> {
        if ChannelGain::from_gain(gain).is_none() {
            return Err(Error::InvalidGain(gain));
        }
        self.set_gain(gain)
    }

    /// Setting HX711 sensor channel and gain
    ///
    /// Takes effect after the next read.
    pub fn set_channel_gain(&mut self, gain: ChannelGain) {
        // 设置通道和增益后，根据厂家的文档描述，需要采集4次以上新的数据才会稳定
        self.channel_gain = gain;
    }

    /// Set the raw reading that represents zero load
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    /// Take the current load as zero
    pub fn tare(&mut self) -> Result<(), Error<I, O>> {
        let average = self.read_average(DEFAULT_TIMES)?;
        self.set_offset(average);
        #[cfg(feature = "defmt")]
        defmt::debug!("HX711 tare offset: {}", average);
        Ok(())
    }

    /// Derive the scale from a reference weight currently on the load cell
    ///
    /// A zero `reference_weight` stores an infinite or NaN scale.
    pub fn set_scale(&mut self, reference_weight: f64) -> Result<(), Error<I, O>> {
        let average = self.read_average(DEFAULT_TIMES)?;
        self.scale = (average - self.offset) / reference_weight;
        #[cfg(feature = "defmt")]
        defmt::debug!("HX711 scale: {}", self.scale);
        Ok(())
    }

    /// Like [`Driver::set_scale`], but refuses to store a degenerate scale
    ///
    /// Fails with [`Error::InvalidReference`] when the reference weight is
    /// zero or not finite, or when the reading did not move away from the
    /// offset. The stored scale is left untouched on failure.
    pub fn try_set_scale(&mut self, reference_weight: f64) -> Result<(), Error<I, O>> {
        if reference_weight == 0.0 || !reference_weight.is_finite() {
            return Err(Error::InvalidReference);
        }
        let average = self.read_average(DEFAULT_TIMES)?;
        let scale = (average - self.offset) / reference_weight;
        if scale == 0.0 || !scale.is_finite() {
            return Err(Error::InvalidReference);
        }
        self.scale = scale;
        Ok(())
    }

    /// Average of `times` reads minus the offset, not scaled
    pub fn get_value(&mut self, times: u16) -> Result<f64, Error<I, O>> {
        Ok(self.read_average(times)? - self.offset)
    }

    /// Average of `times` reads converted into calibrated units
    ///
    /// A zero scale yields an infinite or NaN result rather than an error.
    pub fn get_units(&mut self, times: u16) -> Result<f64, Error<I, O>> {
        Ok(self.get_value(times)? / self.scale)
    }
}
