use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Component, Path, PathBuf},
};

use libc::EIO;

use crate::storage::{DirEntry, Disposition, Filesystem, OpenMode, Result};

/// A filesystem that maps absolute paths onto a directory of the host.
pub struct HostFs {
    root: PathBuf,
}

impl HostFs {
    /// Uses `root` as the filesystem's `/`. The directory must exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(libc::ENOTDIR);
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if !path.starts_with('/') {
            return Err(libc::EINVAL);
        }
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir | Component::Prefix(_) => return Err(libc::EINVAL),
            }
        }
        Ok(resolved)
    }
}

impl Filesystem for HostFs {
    type File = File;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<File> {
        let path = self.resolve(path)?;

        // The host refuses to create or truncate without write access.
        if !mode.write {
            match mode.disposition {
                Disposition::OpenAlways if !path.exists() => {
                    File::create(&path).into_errno()?;
                }
                Disposition::CreateAlways => {
                    File::create(&path).into_errno()?;
                }
                _ => {}
            }
            return OpenOptions::new().read(true).open(&path).into_errno();
        }

        let mut options = OpenOptions::new();
        options.read(mode.read).write(true);
        match mode.disposition {
            Disposition::OpenExisting => {}
            Disposition::OpenAlways => {
                options.create(true);
            }
            Disposition::CreateAlways => {
                options.create(true).truncate(true);
            }
        }
        options.open(&path).into_errno()
    }

    fn read(&mut self, file: &mut File, buf: &mut [u8]) -> Result<usize> {
        file.read(buf).into_errno()
    }

    fn write(&mut self, file: &mut File, buf: &[u8]) -> Result<usize> {
        file.write(buf).into_errno()
    }

    fn seek(&mut self, file: &mut File, pos: u64) -> Result<()> {
        file.seek(SeekFrom::Start(pos)).into_errno().map(|_| ())
    }

    fn tell(&mut self, file: &mut File) -> Result<u64> {
        file.stream_position().into_errno()
    }

    fn size(&mut self, file: &mut File) -> Result<u64> {
        file.metadata().into_errno().map(|m| m.len())
    }

    fn sync(&mut self, file: &mut File) -> Result<()> {
        file.sync_all().into_errno()
    }

    fn close(&mut self, file: File) {
        drop(file);
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        fs::create_dir(self.resolve(path)?).into_errno()
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let to = self.resolve(to)?;
        if to.exists() {
            return Err(libc::EEXIST);
        }
        fs::rename(self.resolve(from)?, to).into_errno()
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path)?;
        if path.is_dir() {
            fs::remove_dir(path).into_errno()
        } else {
            fs::remove_file(path).into_errno()
        }
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?).into_errno()? {
            let entry = entry.into_errno()?;
            let is_dir = entry.file_type().into_errno()?.is_dir();
            let name = entry.file_name().to_str().ok_or(libc::EILSEQ)?.to_string();
            entries.push(DirEntry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

trait IntoErrno {
    type T;

    fn into_errno(self) -> Result<Self::T>;
}

impl<T> IntoErrno for io::Result<T> {
    type T = T;

    fn into_errno(self) -> Result<Self::T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.raw_os_error().unwrap_or(EIO)),
        }
    }
}
