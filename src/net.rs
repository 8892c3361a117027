use std::net::{Shutdown, SocketAddr};

/// A socket as numbered by the socket stack.
pub type SocketHandle = i32;

pub type Result<T> = core::result::Result<T, libc::c_int>;

/// An implementation of `SocketStack` provides sockets addressed by numeric handles.
///
/// Arguments and results pass through the descriptor table untranslated.
/// Anything a stack does not implement fails with `EOPNOTSUPP`.
pub trait SocketStack: Send {
    fn socket(&mut self, _domain: i32, _ty: i32, _protocol: i32) -> Result<SocketHandle> {
        Err(libc::EOPNOTSUPP)
    }

    fn accept(&mut self, _socket: SocketHandle) -> Result<(SocketHandle, SocketAddr)> {
        Err(libc::EOPNOTSUPP)
    }

    fn connect(&mut self, _socket: SocketHandle, _addr: &SocketAddr) -> Result<()> {
        Err(libc::EOPNOTSUPP)
    }

    fn bind(&mut self, _socket: SocketHandle, _addr: &SocketAddr) -> Result<()> {
        Err(libc::EOPNOTSUPP)
    }

    fn listen(&mut self, _socket: SocketHandle, _backlog: i32) -> Result<()> {
        Err(libc::EOPNOTSUPP)
    }

    fn shutdown(&mut self, _socket: SocketHandle, _how: Shutdown) -> Result<()> {
        Err(libc::EOPNOTSUPP)
    }

    fn send(&mut self, _socket: SocketHandle, _buf: &[u8], _flags: i32) -> Result<usize> {
        Err(libc::EOPNOTSUPP)
    }

    fn recv(&mut self, _socket: SocketHandle, _buf: &mut [u8], _flags: i32) -> Result<usize> {
        Err(libc::EOPNOTSUPP)
    }

    fn send_to(
        &mut self,
        _socket: SocketHandle,
        _buf: &[u8],
        _flags: i32,
        _addr: &SocketAddr,
    ) -> Result<usize> {
        Err(libc::EOPNOTSUPP)
    }

    fn recv_from(
        &mut self,
        _socket: SocketHandle,
        _buf: &mut [u8],
        _flags: i32,
    ) -> Result<(usize, SocketAddr)> {
        Err(libc::EOPNOTSUPP)
    }

    fn local_addr(&mut self, _socket: SocketHandle) -> Result<SocketAddr> {
        Err(libc::EOPNOTSUPP)
    }

    fn peer_addr(&mut self, _socket: SocketHandle) -> Result<SocketAddr> {
        Err(libc::EOPNOTSUPP)
    }

    fn set_option(
        &mut self,
        _socket: SocketHandle,
        _level: i32,
        _name: i32,
        _value: &[u8],
    ) -> Result<()> {
        Err(libc::EOPNOTSUPP)
    }

    /// Writes the option into `value`, returning its length.
    fn get_option(
        &mut self,
        _socket: SocketHandle,
        _level: i32,
        _name: i32,
        _value: &mut [u8],
    ) -> Result<usize> {
        Err(libc::EOPNOTSUPP)
    }

    fn ioctl(&mut self, _socket: SocketHandle, _cmd: i64, _arg: &mut i32) -> Result<()> {
        Err(libc::EOPNOTSUPP)
    }

    fn close(&mut self, _socket: SocketHandle) {}
}

/// A socket stack with no sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSockets;

impl SocketStack for NoSockets {}
