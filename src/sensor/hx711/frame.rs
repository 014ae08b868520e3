//! Bit-shift transport and frame assembly
//!
//! A frame is 24 data bits followed by 1-3 gain pulses. The whole sequence
//! runs inside one critical section: an interrupt that stretches a clock-high
//! pulse past 60us powers the chip down mid-frame and every following bit
//! reads back as 1.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_timers::clock::Clock;

use super::{Driver, Error, CLOCK_HOLD};

/// Order in which the bits of a shifted byte arrive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// First sampled bit is bit 0
    LsbFirst,
    /// First sampled bit is bit 7
    MsbFirst,
}

/// Reconstruct a signed sample from the three frame bytes, high byte first
///
/// The HX711 outputs 24-bit twos-complement, so the high byte's top bit is
/// replicated into a fill byte to widen the value to `i32`.
pub fn decode(data: [u8; 3]) -> i32 {
    // 检查符号位（最高位），负数时高8位全部填充1
    let filler = if data[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    i32::from_be_bytes([filler, data[0], data[1], data[2]])
}

impl<'a, C: Clock, I: InputPin, O: OutputPin> Driver<'a, C, I, O> {
    /// Clock in one byte from the data line
    pub fn shift_byte(&mut self, bit_order: BitOrder) -> Result<u8, Error<I, O>> {
        let mut value: u8 = 0;
        for i in 0..8 {
            // 发送时钟信号高电平，表示要开始读取一位数据
            self.clock_pin.set_high().map_err(Error::Output)?;
            // 维持高电平信号1微秒能保证时钟信号到达
            self.delay_impl.delay(CLOCK_HOLD);

            // 读取数据引脚的电平，高电平表示读取到的二进制位为1
            let bit = self.data_pin.is_high().map_err(Error::Input)? as u8;
            value |= match bit_order {
                BitOrder::LsbFirst => bit << i,
                BitOrder::MsbFirst => bit << (7 - i),
            };

            // 发送时钟信号低电平，表示读取完一位数据
            self.clock_pin.set_low().map_err(Error::Output)?;
            self.delay_impl.delay(CLOCK_HOLD);
        }
        Ok(value)
    }

    /// Send a single clock pulse without sampling the data line
    fn clock_pulse(&mut self) -> Result<(), O::Error> {
        self.clock_pin.set_high()?;
        self.delay_impl.delay(CLOCK_HOLD);
        self.clock_pin.set_low()?;
        self.delay_impl.delay(CLOCK_HOLD);
        Ok(())
    }

    /// Shift out a latched frame and commit the channel/gain for the next one
    ///
    /// The caller must have seen the data line low.
    pub(super) fn read_frame(&mut self) -> Result<i32, Error<I, O>> {
        let data = critical_section::with(|_| -> Result<[u8; 3], Error<I, O>> {
            // 读取24位数据，高字节在前
            let mut data = [0u8; 3];
            for byte in data.iter_mut() {
                *byte = self.shift_byte(BitOrder::MsbFirst)?;
            }

            // 设置通道和增益
            // 告知HX711下一次应该发送哪一个通道的数据，以及增益是多少，芯片只关心脉冲个数
            for _ in 0..self.channel_gain.pulses() {
                self.clock_pulse().map_err(Error::Output)?;
            }
            Ok(data)
        })?;

        let value = decode(data);
        #[cfg(feature = "defmt")]
        defmt::trace!("HX711 raw frame: {}", value);
        Ok(value)
    }

    /// Read one raw sample
    ///
    /// Blocks until the chip is ready; there is no timeout, an absent device
    /// hangs here forever. Use [`Driver::read_raw_timeout`] or check one of the
    /// bounded waits first when the device may be missing.
    pub fn read_raw(&mut self) -> Result<i32, Error<I, O>> {
        self.wait_ready(core::time::Duration::ZERO)?;
        self.read_frame()
    }

    /// Read one raw sample if a conversion is already latched
    pub fn try_read_raw(&mut self) -> Result<i32, Error<I, O>> {
        // 检查数模转换芯片是否就绪
        if !self.is_ready().map_err(Error::Input)? {
            return Err(Error::NotReady);
        }
        self.read_frame()
    }
}
