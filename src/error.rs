pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The descriptor table, the device registry or a queue allocation is full.
    ResourceExhausted,
    /// The descriptor is out of range or its slot is empty.
    NotFound,
    /// A collaborator (filesystem, socket stack, device discovery) reported an errno.
    Backing(libc::c_int),
    /// The descriptor was not opened with the access the call needs.
    PermissionDenied,
    /// The call is not valid for this kind of descriptor.
    Unsupported,
    /// The table lock could not be taken in time, or the device is already bound.
    Busy,
    InvalidPath,
    InstallFailed,
    NotTty,
}

impl Error {
    /// Returns the errno this error is reported as.
    pub fn errno(self) -> libc::c_int {
        self.into()
    }
}

impl From<libc::c_int> for Error {
    fn from(errno: libc::c_int) -> Self {
        Self::Backing(errno)
    }
}

impl From<Error> for libc::c_int {
    fn from(err: Error) -> Self {
        match err {
            Error::ResourceExhausted => libc::ENFILE,
            Error::NotFound => libc::EBADF,
            Error::Backing(errno) => errno,
            Error::PermissionDenied => libc::EACCES,
            Error::Unsupported => libc::EOPNOTSUPP,
            Error::Busy => libc::EBUSY,
            Error::InvalidPath => libc::EINVAL,
            Error::InstallFailed => libc::EIO,
            Error::NotTty => libc::ENOTTY,
        }
    }
}
