pub mod marker;
pub mod termios;

use std::{fmt, time::Duration};

use crate::{device::termios::Termios, error::Error, pipe::Pipe};

/// Index of an installed device in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(usize);

impl DeviceId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// An implementation of `Driver` moves bytes between a device and the queues of its [Pipe].
///
/// Every callback is optional. Callbacks run while the descriptor table is locked,
/// so they must not call back into the table.
pub trait Driver: Send {
    /// Called after a descriptor binds to the device.
    fn open(&mut self, _dev: &DeviceState) -> Result<()> {
        Ok(())
    }

    /// Called before the bound descriptor is torn down.
    fn close(&mut self, _dev: &DeviceState) -> Result<()> {
        Ok(())
    }

    /// Called once at open when the descriptor is readable.
    fn read_enable(&mut self, _dev: &DeviceState) -> Result<()> {
        Ok(())
    }

    /// Called after every write, once the bytes are queued.
    fn write_enable(&mut self, _dev: &DeviceState) -> Result<()> {
        Ok(())
    }

    /// Reads or applies [DeviceState::termios].
    fn ioctl(&mut self, _dev: &mut DeviceState) -> Result<()> {
        Err(libc::ENOTTY)
    }
}

pub type Result<T> = core::result::Result<T, libc::c_int>;

/// The part of a device record visible to its driver.
pub struct DeviceState {
    id: DeviceId,
    pub(crate) timeout: Duration,
    pub(crate) pipe: Pipe,
    termios: Option<Termios>,
    pub(crate) bound: bool,
}

impl DeviceState {
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// How long the first byte of a transfer may block. Zero means non-blocking.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn pipe(&self) -> &Pipe {
        &self.pipe
    }

    /// Settings being exchanged by the ioctl in progress, if any.
    pub fn termios(&self) -> Option<&Termios> {
        self.termios.as_ref()
    }

    pub fn termios_mut(&mut self) -> Option<&mut Termios> {
        self.termios.as_mut()
    }
}

/// A driver together with its state, owned by the device registry.
pub(crate) struct DeviceRecord {
    driver: Box<dyn Driver>,
    pub(crate) state: DeviceState,
}

impl DeviceRecord {
    pub(crate) fn new(id: DeviceId, driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            state: DeviceState {
                id,
                timeout: Duration::ZERO,
                pipe: Pipe::default(),
                termios: None,
                bound: false,
            },
        }
    }

    pub(crate) fn open(&mut self) {
        let res = self.driver.open(&self.state);
        self.report("open", res);
    }

    pub(crate) fn close(&mut self) {
        let res = self.driver.close(&self.state);
        self.report("close", res);
    }

    pub(crate) fn read_enable(&mut self) {
        let res = self.driver.read_enable(&self.state);
        self.report("read_enable", res);
    }

    pub(crate) fn write_enable(&mut self) {
        let res = self.driver.write_enable(&self.state);
        self.report("write_enable", res);
    }

    /// Runs the driver's ioctl with `termios` set for the duration of the call.
    /// Returns the settings as the driver left them.
    pub(crate) fn ioctl(&mut self, termios: Termios) -> crate::error::Result<Termios> {
        self.state.termios = Some(termios);
        let res = self.driver.ioctl(&mut self.state);
        let termios = self.state.termios.take().unwrap_or(termios);
        match res {
            Ok(()) => Ok(termios),
            Err(libc::ENOTTY) => Err(Error::NotTty),
            Err(errno) => Err(Error::Backing(errno)),
        }
    }

    /// Releases the pipe so another descriptor may bind.
    pub(crate) fn unbind(&mut self) {
        self.state.pipe.destroy();
        self.state.bound = false;
    }

    fn report(&self, callback: &str, res: Result<()>) {
        if let Err(errno) = res {
            log::warn!("{}: {} callback failed with errno {}", self.state.id, callback, errno);
        }
    }
}
