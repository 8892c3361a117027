pub mod file;
pub mod map;

use crate::flags::OpenFlags;

/// How `open` treats a path that does or does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fails with `ENOENT` when the file is missing.
    OpenExisting,
    /// Creates the file when it is missing.
    OpenAlways,
    /// Creates the file, truncating it if it exists.
    CreateAlways,
}

/// Mode bits handed to [Filesystem::open].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub disposition: Disposition,
}

impl OpenMode {
    /// Mode used to read a device marker file.
    pub const MARKER_READ: Self = Self {
        read: true,
        write: false,
        disposition: Disposition::OpenExisting,
    };

    /// Mode used to (re)write a device marker file.
    pub const MARKER_WRITE: Self = Self {
        read: false,
        write: true,
        disposition: Disposition::OpenAlways,
    };

    /// Translates access, create and truncate flags into filesystem mode bits.
    pub fn from_flags(flags: OpenFlags) -> Self {
        let disposition = if flags.contains(OpenFlags::CREATE) {
            if flags.contains(OpenFlags::TRUNCATE) {
                Disposition::CreateAlways
            } else {
                Disposition::OpenAlways
            }
        } else {
            Disposition::OpenExisting
        };

        Self {
            read: flags.readable(),
            write: flags.writable(),
            disposition,
        }
    }
}

/// An entry listed by [Filesystem::read_dir].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// An implementation of `Filesystem` stores named files and directories.
/// Errors are reported as errno values.
///
/// Paths are always absolute and `/`-separated. There is no working directory,
/// so a relative path fails with `EINVAL`.
pub trait Filesystem: Send {
    /// An open file.
    type File: Send;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File>;

    /// Reads from the current position, returning the number of bytes read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize>;

    /// Writes at the current position, returning the number of bytes written.
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> Result<usize>;

    /// Moves the current position to `pos` bytes from the start.
    fn seek(&mut self, file: &mut Self::File, pos: u64) -> Result<()>;

    fn tell(&mut self, file: &mut Self::File) -> Result<u64>;

    fn size(&mut self, file: &mut Self::File) -> Result<u64>;

    fn sync(&mut self, file: &mut Self::File) -> Result<()>;

    fn close(&mut self, file: Self::File);

    fn mkdir(&mut self, path: &str) -> Result<()>;

    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Removes a file or an empty directory.
    fn unlink(&mut self, path: &str) -> Result<()>;

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>>;
}

pub type Result<T> = core::result::Result<T, libc::c_int>;

#[cfg(test)]
pub mod tests {
    use super::*;

    pub trait TestableFilesystem: Filesystem + Sized {
        /// Keeps whatever backs the filesystem alive for the duration of a test.
        type Guard;

        fn new_for_test() -> (Self, Self::Guard);
    }

    const CREATE_RW: OpenMode = OpenMode {
        read: true,
        write: true,
        disposition: Disposition::CreateAlways,
    };

    const READ_EXISTING: OpenMode = OpenMode {
        read: true,
        write: false,
        disposition: Disposition::OpenExisting,
    };

    pub fn write_and_read<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        let mut file = fs.open("/hello.txt", CREATE_RW).unwrap();
        assert_eq!(fs.write(&mut file, b"hello").unwrap(), 5);
        fs.close(file);

        let mut file = fs.open("/hello.txt", READ_EXISTING).unwrap();
        let mut buf = [0u8; 16];
        let n = fs.read(&mut file, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(fs.size(&mut file).unwrap(), 5);
        assert_eq!(fs.tell(&mut file).unwrap(), 5);
        fs.close(file);
    }

    pub fn open_missing<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        assert_eq!(
            fs.open("/missing", READ_EXISTING).err(),
            Some(libc::ENOENT)
        );
    }

    pub fn open_always_keeps_contents<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        let mut file = fs.open("/keep", CREATE_RW).unwrap();
        fs.write(&mut file, b"abc").unwrap();
        fs.close(file);

        let mode = OpenMode {
            disposition: Disposition::OpenAlways,
            ..CREATE_RW
        };
        let mut file = fs.open("/keep", mode).unwrap();
        assert_eq!(fs.size(&mut file).unwrap(), 3);
        fs.write(&mut file, b"x").unwrap();
        fs.close(file);

        let mut file = fs.open("/keep", READ_EXISTING).unwrap();
        let mut buf = [0u8; 3];
        fs.read(&mut file, &mut buf).unwrap();
        assert_eq!(&buf, b"xbc");
        fs.close(file);
    }

    pub fn create_always_truncates<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        let mut file = fs.open("/trunc", CREATE_RW).unwrap();
        fs.write(&mut file, b"abcdef").unwrap();
        fs.close(file);

        let mut file = fs.open("/trunc", CREATE_RW).unwrap();
        assert_eq!(fs.size(&mut file).unwrap(), 0);
        fs.close(file);
    }

    pub fn seek<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        let mut file = fs.open("/seek", CREATE_RW).unwrap();
        fs.write(&mut file, b"0123456789").unwrap();
        fs.seek(&mut file, 4).unwrap();
        assert_eq!(fs.tell(&mut file).unwrap(), 4);

        let mut buf = [0u8; 3];
        fs.read(&mut file, &mut buf).unwrap();
        assert_eq!(&buf, b"456");
        fs.close(file);
    }

    pub fn dirs<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        fs.mkdir("/dev").unwrap();
        assert_eq!(fs.mkdir("/dev").err(), Some(libc::EEXIST));

        let file = fs.open("/dev/tty0", CREATE_RW).unwrap();
        fs.close(file);

        let entries = fs.read_dir("/dev").unwrap();
        assert_eq!(
            entries,
            vec![DirEntry {
                name: "tty0".to_string(),
                is_dir: false,
            }]
        );
    }

    pub fn relative_paths<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        assert_eq!(fs.open("notes.txt", CREATE_RW).err(), Some(libc::EINVAL));
        assert_eq!(fs.mkdir("dev").err(), Some(libc::EINVAL));
        assert_eq!(fs.read_dir("").err(), Some(libc::EINVAL));
    }

    pub fn rename_and_unlink<F: TestableFilesystem>() {
        let (mut fs, _guard) = F::new_for_test();
        let file = fs.open("/old", CREATE_RW).unwrap();
        fs.close(file);

        fs.rename("/old", "/new").unwrap();
        assert_eq!(fs.open("/old", READ_EXISTING).err(), Some(libc::ENOENT));

        fs.unlink("/new").unwrap();
        assert_eq!(fs.open("/new", READ_EXISTING).err(), Some(libc::ENOENT));
        assert_eq!(fs.unlink("/new").err(), Some(libc::ENOENT));
    }
}

#[macro_export]
macro_rules! test_filesystem {
    ($fs:ty) => {
        #[test]
        fn write_and_read() {
            $crate::storage::tests::write_and_read::<$fs>();
        }

        #[test]
        fn open_missing() {
            $crate::storage::tests::open_missing::<$fs>();
        }

        #[test]
        fn open_always_keeps_contents() {
            $crate::storage::tests::open_always_keeps_contents::<$fs>();
        }

        #[test]
        fn create_always_truncates() {
            $crate::storage::tests::create_always_truncates::<$fs>();
        }

        #[test]
        fn seek() {
            $crate::storage::tests::seek::<$fs>();
        }

        #[test]
        fn dirs() {
            $crate::storage::tests::dirs::<$fs>();
        }

        #[test]
        fn rename_and_unlink() {
            $crate::storage::tests::rename_and_unlink::<$fs>();
        }

        #[test]
        fn relative_paths() {
            $crate::storage::tests::relative_paths::<$fs>();
        }
    };
}
