//! Readiness waits and averaged reads

use core::hint::spin_loop;
use core::time::Duration;

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_timers::clock::Clock;

use super::{Driver, Error};

impl<'a, C: Clock, I: InputPin, O: OutputPin> Driver<'a, C, I, O> {
    /// Block until a conversion is latched, pausing `poll` between checks
    ///
    /// Never returns if the device is absent.
    pub fn wait_ready(&mut self, poll: Duration) -> Result<(), Error<I, O>> {
        while !self.is_ready().map_err(Error::Input)? {
            self.delay_impl.delay(poll);
        }
        Ok(())
    }

    /// Check readiness at most `retries` times, pausing `poll` after each miss
    pub fn wait_ready_retry(&mut self, retries: u32, poll: Duration) -> Result<bool, Error<I, O>> {
        for _ in 0..retries {
            if self.is_ready().map_err(Error::Input)? {
                return Ok(true);
            }
            self.delay_impl.delay(poll);
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("HX711 not ready after {} retries", retries);
        Ok(false)
    }

    /// Wait for readiness until `timeout` has elapsed since the call
    pub fn wait_ready_timeout(
        &mut self,
        timeout: Duration,
        poll: Duration,
    ) -> Result<bool, Error<I, O>> {
        // 获取开始时间点
        let start = self.clock_impl.now();
        // 循环检查，直到超时
        while (self.clock_impl.now() - start) < timeout {
            if self.is_ready().map_err(Error::Input)? {
                return Ok(true);
            }
            self.delay_impl.delay(poll);
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("HX711 not ready within {} ms", timeout.as_millis() as u64);
        Ok(false)
    }

    /// Wait for readiness until the clock reaches `deadline`
    pub fn wait_ready_until(
        &mut self,
        deadline: C::Instant,
        poll: Duration,
    ) -> Result<bool, Error<I, O>> {
        while self.clock_impl.now() < deadline {
            if self.is_ready().map_err(Error::Input)? {
                return Ok(true);
            }
            self.delay_impl.delay(poll);
        }
        Ok(false)
    }

    /// Read one raw sample, giving up with [`Error::NotReady`] after `timeout`
    pub fn read_raw_timeout(
        &mut self,
        timeout: Duration,
        poll: Duration,
    ) -> Result<i32, Error<I, O>> {
        if !self.wait_ready_timeout(timeout, poll)? {
            return Err(Error::NotReady);
        }
        self.read_frame()
    }

    /// Mean of `times` consecutive raw samples
    ///
    /// Blocks like [`Driver::read_raw`]. `times` must be at least 1.
    pub fn read_average(&mut self, times: u16) -> Result<f64, Error<I, O>> {
        if times == 0 {
            return Err(Error::NoSamples);
        }
        // 24位采样累加，i64不会溢出
        let mut sum: i64 = 0;
        for _ in 0..times {
            sum += self.read_raw()? as i64;
            spin_loop();
        }
        Ok(sum as f64 / times as f64)
    }
}
