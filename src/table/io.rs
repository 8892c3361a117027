use std::{io::SeekFrom, time::Duration};

use super::{Backing, DescriptorTable, Fd, FileType, Inner, Kind, STDIN, Stat};
use crate::{
    device::termios::{SetWhen, Termios},
    error::{Error, Result},
    net::SocketStack,
    storage::{self, Filesystem},
};

impl<F: Filesystem, N: SocketStack> DescriptorTable<F, N> {
    /// Reads up to `buf.len()` bytes from `fd`.
    ///
    /// Standard input fills the whole buffer from the console. A device pipe
    /// waits for its first byte only and stops at the first empty queue.
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        if fd == STDIN {
            let mut console = self.console.lock();
            for b in buf.iter_mut() {
                *b = console.getc();
            }
            return Ok(buf.len());
        }
        if Self::is_stdio(fd) {
            return Err(Error::PermissionDenied);
        }

        let mut guard = self.lock()?;
        let Inner {
            files,
            devices,
            fs,
            net,
        } = &mut *guard;
        let entry = files.get_mut(self.index(fd)?).ok_or(Error::NotFound)?;
        if !entry.flags.readable() {
            return Err(Error::PermissionDenied);
        }

        match &mut entry.backing {
            Backing::File(file) => Ok(fs.read(file, buf)?),
            Backing::Device { id, .. } => {
                let record = devices.get(id.index()).ok_or(Error::NotFound)?;
                let queue = record.state.pipe().read().ok_or(Error::PermissionDenied)?;
                Ok(transfer(record.state.timeout(), buf.len(), |i, timeout| {
                    queue.receive(timeout).map(|b| buf[i] = b).is_some()
                }))
            }
            Backing::Socket(handle) => Ok(net.recv(*handle, buf, 0)?),
        }
    }

    /// Writes up to `buf.len()` bytes to `fd`.
    ///
    /// A device pipe queues what fits, then signals the driver once.
    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        if Self::is_stdio(fd) {
            if fd == STDIN {
                return Err(Error::PermissionDenied);
            }
            let mut console = self.console.lock();
            for &b in buf {
                console.putc(b);
            }
            return Ok(buf.len());
        }

        let mut guard = self.lock()?;
        let Inner {
            files,
            devices,
            fs,
            net,
        } = &mut *guard;
        let entry = files.get_mut(self.index(fd)?).ok_or(Error::NotFound)?;
        if !entry.flags.writable() {
            return Err(Error::PermissionDenied);
        }

        match &mut entry.backing {
            Backing::File(file) => Ok(fs.write(file, buf)?),
            Backing::Device { id, .. } => {
                let record = devices.get_mut(id.index()).ok_or(Error::NotFound)?;
                let queue = record
                    .state
                    .pipe()
                    .write()
                    .cloned()
                    .ok_or(Error::PermissionDenied)?;
                let n = transfer(record.state.timeout(), buf.len(), |i, timeout| {
                    queue.send(buf[i], timeout)
                });
                record.write_enable();
                Ok(n)
            }
            Backing::Socket(handle) => Ok(net.send(*handle, buf, 0)?),
        }
    }

    /// Repositions a regular file, returning the new offset from the start.
    pub fn lseek(&self, fd: Fd, pos: SeekFrom) -> Result<u64> {
        self.with_file(fd, |fs, file| {
            let target = match pos {
                SeekFrom::Start(offset) => Some(offset),
                SeekFrom::Current(delta) => fs.tell(file)?.checked_add_signed(delta),
                SeekFrom::End(delta) => fs.size(file)?.checked_add_signed(delta),
            }
            .ok_or(libc::EINVAL)?;
            fs.seek(file, target)?;
            Ok(target)
        })
    }

    pub fn ftell(&self, fd: Fd) -> Result<u64> {
        self.with_file(fd, |fs, file| fs.tell(file))
    }

    /// Flushes a regular file. The console has nothing to flush.
    pub fn fsync(&self, fd: Fd) -> Result<()> {
        if Self::is_stdio(fd) {
            return Ok(());
        }
        self.with_file(fd, |fs, file| fs.sync(file))
    }

    pub fn fstat(&self, fd: Fd) -> Result<Stat> {
        if Self::is_stdio(fd) {
            return Ok(Stat {
                file_type: FileType::CharDevice,
                size: 1,
            });
        }

        let mut guard = self.lock()?;
        let Inner { files, fs, .. } = &mut *guard;
        let entry = files.get_mut(self.index(fd)?).ok_or(Error::NotFound)?;
        Ok(match &mut entry.backing {
            Backing::File(file) => Stat {
                file_type: FileType::Regular,
                size: fs.size(file)?,
            },
            Backing::Device { capacity, .. } => Stat {
                file_type: FileType::Fifo,
                size: *capacity as u64,
            },
            Backing::Socket(_) => Stat {
                file_type: FileType::Socket,
                size: 0,
            },
        })
    }

    /// Returns whether `fd` is the console or a device pipe.
    pub fn isatty(&self, fd: Fd) -> bool {
        Self::is_stdio(fd) || matches!(self.kind(fd), Ok(Kind::DevicePipe))
    }

    /// Reads terminal settings. Device pipes ask their driver.
    pub fn tcgetattr(&self, fd: Fd) -> Result<Termios> {
        if Self::is_stdio(fd) {
            return Ok(Termios::console());
        }
        self.device_ioctl(fd, Termios::default())
    }

    /// Hands `termios` to the driver behind a device pipe.
    /// The console's settings are fixed.
    pub fn tcsetattr(&self, fd: Fd, _when: SetWhen, termios: &Termios) -> Result<()> {
        if Self::is_stdio(fd) {
            return Err(Error::Unsupported);
        }
        self.device_ioctl(fd, *termios).map(|_| ())
    }

    fn device_ioctl(&self, fd: Fd, termios: Termios) -> Result<Termios> {
        let mut guard = self.lock()?;
        let Inner { files, devices, .. } = &mut *guard;
        let entry = files.get(self.index(fd)?).ok_or(Error::NotFound)?;
        let Backing::Device { id, .. } = entry.backing else {
            return Err(Error::NotTty);
        };
        devices
            .get_mut(id.index())
            .ok_or(Error::NotFound)?
            .ioctl(termios)
    }

    /// Runs `f` on the regular file behind `fd`.
    fn with_file<T>(
        &self,
        fd: Fd,
        f: impl FnOnce(&mut F, &mut F::File) -> storage::Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock()?;
        let Inner { files, fs, .. } = &mut *guard;
        let entry = files.get_mut(self.index(fd)?).ok_or(Error::NotFound)?;
        match &mut entry.backing {
            Backing::File(file) => Ok(f(fs, file)?),
            _ => Err(Error::Unsupported),
        }
    }
}

/// Moves up to `len` bytes one at a time. Only the first byte may wait.
fn transfer(timeout: Duration, len: usize, mut step: impl FnMut(usize, Duration) -> bool) -> usize {
    let mut timeout = timeout;
    for i in 0..len {
        if !step(i, timeout) {
            return i;
        }
        timeout = Duration::ZERO;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_stops_at_first_failure() {
        let mut waits = Vec::new();
        let n = transfer(Duration::from_millis(10), 5, |i, timeout| {
            waits.push(timeout);
            i < 3
        });
        assert_eq!(n, 3);
        assert_eq!(
            waits,
            vec![
                Duration::from_millis(10),
                Duration::ZERO,
                Duration::ZERO,
                Duration::ZERO
            ]
        );
    }

    #[test]
    fn transfer_empty() {
        assert_eq!(transfer(Duration::ZERO, 0, |_, _| unreachable!()), 0);
    }
}
