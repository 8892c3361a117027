//! Process control for a system running a single process.
//!
//! Every call fails the way a single-process system reports it.

pub type Result<T> = core::result::Result<T, libc::c_int>;

/// Process id of the only process.
pub const PID: i32 = 1;

pub fn getpid() -> i32 {
    PID
}

pub fn fork() -> Result<i32> {
    Err(libc::EAGAIN)
}

pub fn execve(_path: &str, _argv: &[&str], _envp: &[&str]) -> Result<()> {
    Err(libc::ENOMEM)
}

pub fn kill(_pid: i32, _sig: i32) -> Result<()> {
    Err(libc::EINVAL)
}

/// There are never children to wait for.
pub fn wait() -> Result<(i32, i32)> {
    Err(libc::ECHILD)
}

/// Hard links are not supported.
pub fn link(_old: &str, _new: &str) -> Result<()> {
    Err(libc::EMLINK)
}
