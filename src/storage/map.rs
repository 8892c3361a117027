use std::collections::{BTreeMap, BTreeSet};

use crate::storage::{DirEntry, Disposition, Filesystem, OpenMode, Result};

/// Largest file a [MemFs] will hold. Writes that would grow a file past it fail with `EFBIG`.
pub const MAX_FILE_LEN: usize = 1 << 30;

/// A filesystem that keeps every file in memory.
#[derive(Debug, Default)]
pub struct MemFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

/// A file opened on a [MemFs].
#[derive(Debug)]
pub struct MemFile {
    path: String,
    pos: u64,
    read: bool,
    write: bool,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_dir(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn check_parent(&self, path: &str) -> Result<()> {
        if self.is_dir(parent(path)) {
            Ok(())
        } else {
            Err(libc::ENOENT)
        }
    }

    fn contents(&self, file: &MemFile) -> Result<&Vec<u8>> {
        self.files.get(&file.path).ok_or(libc::ENOENT)
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = format!("{dir}/");
        self.files.keys().any(|p| p.starts_with(&prefix))
            || self.dirs.iter().any(|p| p.starts_with(&prefix))
    }
}

impl Filesystem for MemFs {
    type File = MemFile;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemFile> {
        let path = normalize(path)?;
        if self.is_dir(&path) {
            return Err(libc::EISDIR);
        }

        let exists = self.files.contains_key(&path);
        match mode.disposition {
            Disposition::OpenExisting if !exists => return Err(libc::ENOENT),
            Disposition::OpenExisting => {}
            Disposition::OpenAlways => {
                if !exists {
                    self.check_parent(&path)?;
                    self.files.insert(path.clone(), Vec::new());
                }
            }
            Disposition::CreateAlways => {
                self.check_parent(&path)?;
                self.files.insert(path.clone(), Vec::new());
            }
        }

        Ok(MemFile {
            path,
            pos: 0,
            read: mode.read,
            write: mode.write,
        })
    }

    fn read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> Result<usize> {
        if !file.read {
            return Err(libc::EBADF);
        }
        let data = self.contents(file)?;
        let start = usize::try_from(file.pos).unwrap_or(usize::MAX).min(data.len());
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, file: &mut MemFile, buf: &[u8]) -> Result<usize> {
        if !file.write {
            return Err(libc::EBADF);
        }
        let data = self.files.get_mut(&file.path).ok_or(libc::ENOENT)?;
        let (start, end) = usize::try_from(file.pos)
            .ok()
            .and_then(|start| Some((start, start.checked_add(buf.len())?)))
            .filter(|&(_, end)| end <= MAX_FILE_LEN)
            .ok_or(libc::EFBIG)?;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        file.pos = end as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, file: &mut MemFile, pos: u64) -> Result<()> {
        self.contents(file)?;
        file.pos = pos;
        Ok(())
    }

    fn tell(&mut self, file: &mut MemFile) -> Result<u64> {
        Ok(file.pos)
    }

    fn size(&mut self, file: &mut MemFile) -> Result<u64> {
        Ok(self.contents(file)?.len() as u64)
    }

    fn sync(&mut self, file: &mut MemFile) -> Result<()> {
        self.contents(file).map(|_| ())
    }

    fn close(&mut self, _file: MemFile) {}

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path)?;
        if self.is_dir(&path) || self.files.contains_key(&path) {
            return Err(libc::EEXIST);
        }
        self.check_parent(&path)?;
        self.dirs.insert(path);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from = normalize(from)?;
        let to = normalize(to)?;
        if self.is_dir(&to) || self.files.contains_key(&to) {
            return Err(libc::EEXIST);
        }
        self.check_parent(&to)?;

        if let Some(data) = self.files.remove(&from) {
            self.files.insert(to, data);
            return Ok(());
        }

        if !self.dirs.remove(&from) {
            return Err(libc::ENOENT);
        }
        let prefix = format!("{from}/");
        let moved = |p: &String| format!("{to}/{}", &p[prefix.len()..]);

        let files: Vec<_> = self
            .files
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect();
        for path in files {
            if let Some(data) = self.files.remove(&path) {
                self.files.insert(moved(&path), data);
            }
        }

        let dirs: Vec<_> = self
            .dirs
            .iter()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect();
        for path in dirs {
            self.dirs.remove(&path);
            self.dirs.insert(moved(&path));
        }

        self.dirs.insert(to);
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        let path = normalize(path)?;
        if self.files.remove(&path).is_some() {
            return Ok(());
        }
        if !self.dirs.contains(&path) {
            return Err(libc::ENOENT);
        }
        if self.has_children(&path) {
            return Err(libc::ENOTEMPTY);
        }
        self.dirs.remove(&path);
        Ok(())
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        let path = normalize(path)?;
        if !self.is_dir(&path) {
            return Err(libc::ENOTDIR);
        }

        let prefix = if path == "/" {
            path.clone()
        } else {
            format!("{path}/")
        };
        let child = |p: &String| {
            p.strip_prefix(&prefix)
                .filter(|name| !name.is_empty() && !name.contains('/'))
                .map(str::to_string)
        };

        let dirs = self.dirs.iter().filter_map(child).map(|name| DirEntry {
            name,
            is_dir: true,
        });
        let files = self.files.keys().filter_map(child).map(|name| DirEntry {
            name,
            is_dir: false,
        });
        Ok(dirs.chain(files).collect())
    }
}

/// Returns `path` without duplicate or trailing separators.
fn normalize(path: &str) -> Result<String> {
    if !path.starts_with('/') {
        return Err(libc::EINVAL);
    }
    let mut out = String::with_capacity(path.len());
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if part == "." || part == ".." {
            return Err(libc::EINVAL);
        }
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    Ok(out)
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

#[cfg(test)]
mod tests {
    use crate::{storage::tests::TestableFilesystem, test_filesystem};

    use super::*;

    impl TestableFilesystem for MemFs {
        type Guard = ();

        fn new_for_test() -> (Self, ()) {
            (Self::new(), ())
        }
    }

    test_filesystem!(MemFs);

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize("/dev//tty0/").unwrap(), "/dev/tty0");
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("relative"), Err(libc::EINVAL));
        assert_eq!(normalize("/a/../b"), Err(libc::EINVAL));
    }

    #[test]
    fn write_past_limit_fails() {
        let mut fs = MemFs::new();
        let mut file = fs.open("/far", OpenMode::MARKER_WRITE).unwrap();

        fs.seek(&mut file, u64::MAX).unwrap();
        assert_eq!(fs.write(&mut file, b"x"), Err(libc::EFBIG));

        fs.seek(&mut file, MAX_FILE_LEN as u64).unwrap();
        assert_eq!(fs.write(&mut file, b"x"), Err(libc::EFBIG));
        assert_eq!(fs.size(&mut file), Ok(0));

        fs.seek(&mut file, 2).unwrap();
        assert_eq!(fs.write(&mut file, b"x"), Ok(1));
        assert_eq!(fs.size(&mut file), Ok(3));
        fs.close(file);
    }

    #[test]
    fn open_needs_parent() {
        let mut fs = MemFs::new();
        let mode = OpenMode {
            read: true,
            write: true,
            disposition: Disposition::OpenAlways,
        };
        assert_eq!(fs.open("/dev/tty0", mode).err(), Some(libc::ENOENT));
    }

    #[test]
    fn rename_dir_moves_children() {
        let mut fs = MemFs::new();
        fs.mkdir("/a").unwrap();
        let file = fs.open("/a/f", OpenMode::MARKER_WRITE).unwrap();
        fs.close(file);

        fs.rename("/a", "/b").unwrap();
        assert!(fs.open("/b/f", OpenMode::MARKER_READ).is_ok());
        assert_eq!(fs.read_dir("/a").err(), Some(libc::ENOTDIR));
    }

    #[test]
    fn unlink_non_empty_dir() {
        let mut fs = MemFs::new();
        fs.mkdir("/a").unwrap();
        let file = fs.open("/a/f", OpenMode::MARKER_WRITE).unwrap();
        fs.close(file);
        assert_eq!(fs.unlink("/a").err(), Some(libc::ENOTEMPTY));
    }
}
