use std::net::{Shutdown, SocketAddr};

use super::{Backing, DescriptorTable, Entry, Fd, Inner};
use crate::{
    error::{Error, Result},
    flags::OpenFlags,
    net::{self, SocketHandle, SocketStack},
    storage::Filesystem,
};

impl<F: Filesystem, N: SocketStack> DescriptorTable<F, N> {
    /// Creates a socket and gives it a descriptor.
    pub fn socket(&self, domain: i32, ty: i32, protocol: i32) -> Result<Fd> {
        let mut guard = self.lock()?;
        let handle = guard.net.socket(domain, ty, protocol)?;
        self.adopt(&mut guard, handle)
    }

    /// Accepts a connection on a listening socket, giving it a new descriptor.
    pub fn accept(&self, fd: Fd) -> Result<(Fd, SocketAddr)> {
        let mut guard = self.lock()?;
        let listener = self.handle(&guard, fd)?;
        let (handle, addr) = guard.net.accept(listener)?;
        Ok((self.adopt(&mut guard, handle)?, addr))
    }

    pub fn connect(&self, fd: Fd, addr: &SocketAddr) -> Result<()> {
        self.with_socket(fd, |net, s| net.connect(s, addr))
    }

    pub fn bind(&self, fd: Fd, addr: &SocketAddr) -> Result<()> {
        self.with_socket(fd, |net, s| net.bind(s, addr))
    }

    pub fn listen(&self, fd: Fd, backlog: i32) -> Result<()> {
        self.with_socket(fd, |net, s| net.listen(s, backlog))
    }

    pub fn shutdown(&self, fd: Fd, how: Shutdown) -> Result<()> {
        self.with_socket(fd, |net, s| net.shutdown(s, how))
    }

    pub fn send(&self, fd: Fd, buf: &[u8], flags: i32) -> Result<usize> {
        self.with_socket(fd, |net, s| net.send(s, buf, flags))
    }

    pub fn recv(&self, fd: Fd, buf: &mut [u8], flags: i32) -> Result<usize> {
        self.with_socket(fd, |net, s| net.recv(s, buf, flags))
    }

    pub fn send_to(&self, fd: Fd, buf: &[u8], flags: i32, addr: &SocketAddr) -> Result<usize> {
        self.with_socket(fd, |net, s| net.send_to(s, buf, flags, addr))
    }

    pub fn recv_from(&self, fd: Fd, buf: &mut [u8], flags: i32) -> Result<(usize, SocketAddr)> {
        self.with_socket(fd, |net, s| net.recv_from(s, buf, flags))
    }

    /// Returns the address the socket is bound to.
    pub fn local_addr(&self, fd: Fd) -> Result<SocketAddr> {
        self.with_socket(fd, |net, s| net.local_addr(s))
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self, fd: Fd) -> Result<SocketAddr> {
        self.with_socket(fd, |net, s| net.peer_addr(s))
    }

    pub fn set_option(&self, fd: Fd, level: i32, name: i32, value: &[u8]) -> Result<()> {
        self.with_socket(fd, |net, s| net.set_option(s, level, name, value))
    }

    pub fn get_option(&self, fd: Fd, level: i32, name: i32, value: &mut [u8]) -> Result<usize> {
        self.with_socket(fd, |net, s| net.get_option(s, level, name, value))
    }

    pub fn ioctl_socket(&self, fd: Fd, cmd: i64, arg: &mut i32) -> Result<()> {
        self.with_socket(fd, |net, s| net.ioctl(s, cmd, arg))
    }

    /// Stores a socket handle in the lowest free slot.
    /// The handle is closed if the table is full.
    fn adopt(&self, inner: &mut Inner<F, N>, handle: SocketHandle) -> Result<Fd> {
        let entry = Entry {
            flags: OpenFlags::RDWR,
            backing: Backing::Socket(handle),
        };
        match inner.files.insert(entry) {
            Ok(index) => {
                let fd = self.descriptor(index);
                log::debug!("socket {handle} as {fd}");
                Ok(fd)
            }
            Err(entry) => {
                inner.teardown(entry);
                Err(Error::ResourceExhausted)
            }
        }
    }

    fn handle(&self, inner: &Inner<F, N>, fd: Fd) -> Result<SocketHandle> {
        match inner.entry(self.index(fd)?)?.backing {
            Backing::Socket(handle) => Ok(handle),
            _ => Err(Error::Unsupported),
        }
    }

    fn with_socket<T>(
        &self,
        fd: Fd,
        f: impl FnOnce(&mut N, SocketHandle) -> net::Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock()?;
        let handle = self.handle(&guard, fd)?;
        Ok(f(&mut guard.net, handle)?)
    }
}
