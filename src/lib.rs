//! POSIX-style file descriptors over a filesystem, character devices and sockets.
//!
//! A [DescriptorTable] hands out small integer descriptors. Each descriptor is
//! backed by a regular file on a [Filesystem], by a pair of bounded byte queues
//! shared with an installed device [Driver], or by a socket on a [SocketStack].

pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod flags;
pub mod net;
pub mod pipe;
pub mod process;
pub mod slots;
pub mod storage;
pub mod table;
pub mod time;

pub use config::Config;
pub use device::{DeviceId, DeviceState, Driver, termios::Termios};
pub use error::{Error, Result};
pub use flags::OpenFlags;
pub use net::{NoSockets, SocketStack};
pub use storage::Filesystem;
pub use table::{DescriptorTable, Fd, FileType, Kind, Stat};
