use std::{
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::config::Config;

pub type Result<T> = core::result::Result<T, libc::c_int>;

/// Seconds and microseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeVal {
    pub sec: i64,
    pub usec: i64,
}

impl TimeVal {
    fn from_duration(d: Duration) -> Self {
        Self {
            sec: d.as_secs() as i64,
            usec: d.subsec_micros() as i64,
        }
    }
}

/// An implementation of `TimeSource` is the hardware clock behind a [Clock].
pub trait TimeSource: Send {
    /// Returns the time since the epoch, in UTC.
    fn now(&self) -> Duration;

    /// Moves the clock to `time`.
    fn set(&mut self, _time: Duration) -> Result<()> {
        Err(libc::EPERM)
    }
}

/// The host's clock. Setting it only shifts what this source reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource {
    skew_ns: i128,
}

impl SystemTimeSource {
    fn host() -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Duration {
        let ns = (Self::host().as_nanos() as i128 + self.skew_ns).max(0);
        Duration::from_nanos(ns.min(u64::MAX as i128) as u64)
    }

    fn set(&mut self, time: Duration) -> Result<()> {
        self.skew_ns = time.as_nanos() as i128 - Self::host().as_nanos() as i128;
        Ok(())
    }
}

/// Wall-clock time in the local timezone.
pub struct Clock<S: TimeSource = SystemTimeSource> {
    source: S,
    /// Seconds east of UTC.
    offset: i64,
}

impl Clock {
    pub fn system(offset: i64) -> Self {
        Self::new(SystemTimeSource::default(), offset)
    }

    /// A system clock in the timezone `config` names.
    pub fn from_config(config: &Config) -> Self {
        Self::system(config.timezone_offset)
    }
}

impl<S: TimeSource> Clock<S> {
    pub fn new(source: S, offset: i64) -> Self {
        Self { source, offset }
    }

    pub fn gettimeofday(&self) -> TimeVal {
        let mut tv = TimeVal::from_duration(self.source.now());
        tv.sec += self.offset;
        tv
    }

    /// Returns local seconds since the epoch.
    pub fn time(&self) -> i64 {
        self.gettimeofday().sec
    }

    /// Sets the clock from a local time.
    pub fn set_time(&mut self, tv: TimeVal) -> Result<()> {
        let sec = tv
            .sec
            .checked_sub(self.offset)
            .and_then(|sec| u64::try_from(sec).ok())
            .ok_or(libc::EINVAL)?;
        let usec = u32::try_from(tv.usec)
            .ok()
            .filter(|&usec| usec < 1_000_000)
            .ok_or(libc::EINVAL)?;
        self.source
            .set(Duration::from_secs(sec) + Duration::from_micros(usec as u64))
    }

    pub fn sleep(&self, secs: u32) {
        thread::sleep(Duration::from_millis(secs as u64 * 1000));
    }

    /// Sleeps in whole milliseconds; anything under one is not slept.
    pub fn usleep(&self, usecs: u64) {
        thread::sleep(Duration::from_millis(usecs / 1000));
    }
}
