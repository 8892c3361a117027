//! The descriptor table: one lock-guarded array of open files, device pipes and sockets.
//!
//! Descriptors `0`, `1` and `2` always address the console. Table slot `i` is
//! addressed by descriptor `i + Config::offset`.

mod io;
mod socket;


use std::{
    thread,
    time::{Duration, Instant},
};

use spin::{Mutex, MutexGuard};
use zerocopy::IntoBytes;

use crate::{
    config::Config,
    console::{Console, StdConsole},
    device::{
        DeviceId, DeviceRecord, Driver,
        marker::{MARKER_READ_LEN, Marker},
    },
    error::{Error, Result},
    flags::OpenFlags,
    net::{NoSockets, SocketHandle, SocketStack},
    pipe::Pipe,
    slots::Slots,
    storage::{DirEntry, Filesystem, OpenMode},
};

/// A descriptor number.
pub type Fd = i32;

pub const STDIN: Fd = libc::STDIN_FILENO;
pub const STDOUT: Fd = libc::STDOUT_FILENO;
pub const STDERR: Fd = libc::STDERR_FILENO;

/// What a descriptor addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    RegularFile,
    DevicePipe,
    Socket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CharDevice,
    Regular,
    Fifo,
    Socket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub file_type: FileType,
    /// File length, or queue capacity for device pipes.
    pub size: u64,
}

/// An open resource. Its backing is fixed when the entry is built.
struct Entry<H> {
    flags: OpenFlags,
    backing: Backing<H>,
}

enum Backing<H> {
    File(H),
    Device {
        id: DeviceId,
        marker: H,
        capacity: usize,
    },
    Socket(SocketHandle),
}

impl<H> Entry<H> {
    fn kind(&self) -> Kind {
        match self.backing {
            Backing::File(_) => Kind::RegularFile,
            Backing::Device { .. } => Kind::DevicePipe,
            Backing::Socket(_) => Kind::Socket,
        }
    }
}

/// Everything guarded by the table lock.
struct Inner<F: Filesystem, N> {
    files: Slots<Entry<F::File>>,
    devices: Slots<DeviceRecord>,
    fs: F,
    net: N,
}

/// Maps descriptors onto regular files, device pipes and sockets.
pub struct DescriptorTable<F: Filesystem, N: SocketStack = NoSockets> {
    config: Config,
    inner: Mutex<Inner<F, N>>,
    console: Mutex<Box<dyn Console>>,
}

impl<F: Filesystem> DescriptorTable<F, NoSockets> {
    /// Constructs an empty table without socket support.
    pub fn new(config: Config, fs: F) -> Self {
        Self::with_sockets(config, fs, NoSockets)
    }
}

impl<F: Filesystem, N: SocketStack> DescriptorTable<F, N> {
    /// Constructs an empty table whose socket descriptors live on `net`.
    pub fn with_sockets(config: Config, fs: F, net: N) -> Self {
        let inner = Inner {
            files: Slots::new(config.files),
            devices: Slots::new(config.devices),
            fs,
            net,
        };
        Self {
            config,
            inner: Mutex::new(inner),
            console: Mutex::new(Box::new(StdConsole)),
        }
    }

    /// Replaces the console behind the stdio descriptors.
    pub fn with_console(self, console: impl Console + 'static) -> Self {
        *self.console.lock() = Box::new(console);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the number of open table descriptors.
    pub fn count(&self) -> Result<usize> {
        Ok(self.lock()?.files.count())
    }

    pub fn kind(&self, fd: Fd) -> Result<Kind> {
        let inner = self.lock()?;
        Ok(inner.entry(self.index(fd)?)?.kind())
    }

    /// Returns the device a device-pipe descriptor is bound to.
    pub fn device_id(&self, fd: Fd) -> Result<DeviceId> {
        let inner = self.lock()?;
        match inner.entry(self.index(fd)?)?.backing {
            Backing::Device { id, .. } => Ok(id),
            _ => Err(Error::Unsupported),
        }
    }

    /// Registers `driver` and binds it to the marker file at `name`.
    ///
    /// The registry index is written into the marker as a single byte; a later
    /// [open](Self::open) of `name` reads it back to find the driver.
    pub fn install_device<D: Driver + 'static>(&self, name: &str, driver: D) -> Result<DeviceId> {
        log::info!("installing {name}...");
        if !self.is_device_path(name) {
            log::error!("{name} is not under {}", self.config.device_dir);
            return Err(Error::InvalidPath);
        }

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        // Fails when the directory already exists. Opening the marker catches any real problem.
        let _ = inner.fs.mkdir(&self.config.device_dir);

        let mut file = inner.fs.open(name, OpenMode::MARKER_WRITE).map_err(|errno| {
            log::error!("failed to open device {name}: errno {errno}");
            Error::InstallFailed
        })?;
        let res = inner.register(&mut file, Box::new(driver));
        inner.fs.close(file);

        match res {
            Ok(id) => log::info!("{name} OK as {id}"),
            Err(_) => log::error!("failed to write device {name}"),
        }
        res
    }

    /// Opens `path`, returning its descriptor.
    ///
    /// Paths under the device directory open a pipe to the installed device, with
    /// queues of `length` bytes for each requested direction. Other paths open a
    /// regular file and `length` is ignored.
    pub fn open(&self, path: &str, flags: OpenFlags, length: usize) -> Result<Fd> {
        if path.is_empty() {
            return Err(Error::InvalidPath);
        }
        let flags = flags.normalized();

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        let entry = if self.is_device_path(path) {
            inner.open_device(path, flags, length, self.config.device_timeout)?
        } else {
            inner.open_file(path, flags)?
        };

        let index = match inner.files.insert(entry) {
            Ok(index) => index,
            Err(entry) => {
                inner.teardown(entry);
                log::debug!("cannot open {path}: table full");
                return Err(Error::ResourceExhausted);
            }
        };

        if let Some(Backing::Device { id, .. }) = inner.files.get(index).map(|e| &e.backing) {
            let id = *id;
            if let Some(record) = inner.devices.get_mut(id.index()) {
                record.open();
                // Writing is enabled per write call.
                if flags.readable() {
                    record.read_enable();
                }
            }
        }

        let fd = self.descriptor(index);
        log::debug!("opened {path} as {fd}");
        Ok(fd)
    }

    /// Closes `fd` and releases whatever backs it.
    pub fn close(&self, fd: Fd) -> Result<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let index = self.index(fd)?;

        // The device must stop using the queues before they go away.
        if let Backing::Device { id, .. } = inner.entry(index)?.backing {
            if let Some(record) = inner.devices.get_mut(id.index()) {
                record.close();
            }
        }

        let entry = inner.files.remove(index).ok_or(Error::NotFound)?;
        inner.teardown(entry);
        log::debug!("closed {fd}");
        Ok(())
    }

    /// Opens `path` read-only just long enough to [fstat](Self::fstat) it.
    pub fn stat(&self, path: &str) -> Result<Stat> {
        let fd = self.open(path, OpenFlags::RDONLY, 0)?;
        let res = self.fstat(fd);
        self.close(fd)?;
        res
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        Ok(self.lock()?.fs.mkdir(path)?)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        Ok(self.lock()?.fs.unlink(path)?)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        Ok(self.lock()?.fs.rename(from, to)?)
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        Ok(self.lock()?.fs.read_dir(path)?)
    }

    /// Takes the table lock, giving up after `Config::lock_timeout`.
    fn lock(&self) -> Result<MutexGuard<'_, Inner<F, N>>> {
        let deadline = Instant::now() + self.config.lock_timeout;
        loop {
            if let Some(guard) = self.inner.try_lock() {
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                log::warn!("descriptor table lock timed out");
                return Err(Error::Busy);
            }
            thread::yield_now();
        }
    }

    fn is_device_path(&self, path: &str) -> bool {
        let dir = self.config.device_dir.trim_end_matches('/');
        path.strip_prefix(dir)
            .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
    }

    fn is_stdio(fd: Fd) -> bool {
        matches!(fd, STDIN | STDOUT | STDERR)
    }

    fn index(&self, fd: Fd) -> Result<usize> {
        let index = fd.checked_sub(self.config.offset).ok_or(Error::NotFound)?;
        usize::try_from(index).map_err(|_| Error::NotFound)
    }

    fn descriptor(&self, index: usize) -> Fd {
        index as Fd + self.config.offset
    }
}

impl<F: Filesystem, N: SocketStack> Inner<F, N> {
    fn entry(&self, index: usize) -> Result<&Entry<F::File>> {
        self.files.get(index).ok_or(Error::NotFound)
    }

    fn open_file(&mut self, path: &str, flags: OpenFlags) -> Result<Entry<F::File>> {
        let mut file = self.fs.open(path, OpenMode::from_flags(flags))?;

        if flags.contains(OpenFlags::APPEND) {
            let res = self
                .fs
                .size(&mut file)
                .and_then(|end| self.fs.seek(&mut file, end));
            if let Err(errno) = res {
                self.fs.close(file);
                return Err(errno.into());
            }
        }

        Ok(Entry {
            flags,
            backing: Backing::File(file),
        })
    }

    fn open_device(
        &mut self,
        path: &str,
        flags: OpenFlags,
        capacity: usize,
        timeout: Duration,
    ) -> Result<Entry<F::File>> {
        let mut marker = self.fs.open(path, OpenMode::MARKER_READ)?;
        match self.bind(&mut marker, flags, capacity, timeout) {
            Ok(id) => {
                log::debug!("{path} bound to {id}");
                Ok(Entry {
                    flags,
                    backing: Backing::Device {
                        id,
                        marker,
                        capacity,
                    },
                })
            }
            Err(err) => {
                self.fs.close(marker);
                Err(err)
            }
        }
    }

    /// Finds the device named by `marker` and gives it the queues `flags` ask for.
    fn bind(
        &mut self,
        marker: &mut F::File,
        flags: OpenFlags,
        capacity: usize,
        timeout: Duration,
    ) -> Result<DeviceId> {
        let mut buf = [0u8; MARKER_READ_LEN];
        let n = self.fs.read(marker, &mut buf)?;
        let record = Marker::parse(&buf[..n])
            .and_then(|found| self.devices.get_mut(found.index()))
            .ok_or(Error::Backing(libc::ENODEV))?;

        if record.state.bound {
            return Err(Error::Busy);
        }

        record.state.timeout = if flags.contains(OpenFlags::NONBLOCK) {
            Duration::ZERO
        } else {
            timeout
        };
        record.state.pipe = Pipe::create(flags.writable(), flags.readable(), capacity)
            .ok_or(Error::ResourceExhausted)?;
        record.state.bound = true;
        Ok(record.state.id())
    }

    /// Writes the lowest free registry index into `marker` and installs `driver` there.
    fn register(&mut self, marker: &mut F::File, driver: Box<dyn Driver>) -> Result<DeviceId> {
        let index = self.devices.first_free().ok_or(Error::InstallFailed)?;
        let bytes = Marker::new(index).ok_or(Error::InstallFailed)?;

        match self.fs.write(marker, bytes.as_bytes()) {
            Ok(1) => {}
            _ => return Err(Error::InstallFailed),
        }

        let id = DeviceId::new(index);
        self.devices
            .insert_at(index, DeviceRecord::new(id, driver))
            .map_err(|_| Error::InstallFailed)?;
        Ok(id)
    }

    /// Releases the resources behind an entry that is no longer in the table.
    fn teardown(&mut self, entry: Entry<F::File>) {
        match entry.backing {
            Backing::File(file) => self.fs.close(file),
            Backing::Device { id, marker, .. } => {
                self.fs.close(marker);
                if let Some(record) = self.devices.get_mut(id.index()) {
                    record.unbind();
                }
            }
            Backing::Socket(handle) => {
                if handle >= 0 {
                    self.net.close(handle);
                }
            }
        }
    }
}
