use std::fs;
use std::io::SeekFrom;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fdmux::{
    Config, DescriptorTable, DeviceState, Driver, Error, FileType, Kind, OpenFlags,
    storage::file::HostFs,
};
use tempfile::TempDir;

struct Context {
    table: DescriptorTable<HostFs>,
    dir: TempDir,
}

impl Context {
    fn new(config: Config) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().expect("failed to create root dir");
        let fs = HostFs::new(dir.path()).expect("failed to open root dir");
        Self {
            table: DescriptorTable::new(config, fs),
            dir,
        }
    }
}

/// Writes every queued byte straight back.
struct Loopback;

impl Driver for Loopback {
    fn write_enable(&mut self, dev: &DeviceState) -> fdmux::device::Result<()> {
        let (Some(tx), Some(rx)) = (dev.pipe().write(), dev.pipe().read()) else {
            return Ok(());
        };
        while let Some(b) = tx.receive(Duration::ZERO) {
            if !rx.send(b, Duration::ZERO) {
                break;
            }
        }
        Ok(())
    }
}

/// Echoes from a thread of its own, the way an interrupt-driven UART would.
struct Uart {
    worker: Option<thread::JoinHandle<()>>,
}

impl Driver for Uart {
    fn open(&mut self, dev: &DeviceState) -> fdmux::device::Result<()> {
        let (Some(tx), Some(rx)) = (dev.pipe().write().cloned(), dev.pipe().read().cloned())
        else {
            return Err(libc::EINVAL);
        };
        self.worker = Some(thread::spawn(move || {
            // Exits once the pipe is torn down and this thread holds the last references.
            while Arc::strong_count(&tx) > 1 {
                if let Some(b) = tx.receive(Duration::from_millis(10)) {
                    rx.send(b.to_ascii_uppercase(), Duration::from_secs(1));
                }
            }
        }));
        Ok(())
    }
}

impl Drop for Uart {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[test]
fn regular_file() {
    let ctx = Context::new(Config::default());
    let table = &ctx.table;

    let fd = table
        .open("/notes.txt", OpenFlags::RDWR | OpenFlags::CREATE, 0)
        .unwrap();
    assert_eq!(fd, 3);
    assert_eq!(table.write(fd, b"abc"), Ok(3));
    assert_eq!(table.fsync(fd), Ok(()));
    assert_eq!(table.lseek(fd, SeekFrom::Start(0)), Ok(0));

    let mut buf = [0u8; 3];
    assert_eq!(table.read(fd, &mut buf), Ok(3));
    assert_eq!(&buf, b"abc");
    table.close(fd).unwrap();

    let stat = table.stat("/notes.txt").unwrap();
    assert_eq!(stat.file_type, FileType::Regular);
    assert_eq!(stat.size, 3);
    assert_eq!(fs::read(ctx.dir.path().join("notes.txt")).unwrap(), b"abc");
}

#[test]
fn rejects_escaping_paths() {
    let ctx = Context::new(Config::default());
    assert_eq!(
        ctx.table
            .open("/../outside", OpenFlags::RDWR | OpenFlags::CREATE, 0),
        Err(Error::Backing(libc::EINVAL))
    );
}

#[test]
fn device_loopback() {
    let ctx = Context::new(Config {
        devices: 8,
        ..Config::default()
    });
    let table = &ctx.table;

    let id = table.install_device("/dev/tty0", Loopback).unwrap();
    assert_eq!(fs::read(ctx.dir.path().join("dev/tty0")).unwrap(), [id.index() as u8]);

    let fd = table.open("/dev/tty0", OpenFlags::RDWR, 4).unwrap();
    assert_eq!(table.kind(fd), Ok(Kind::DevicePipe));
    assert_eq!(table.write(fd, b"1234"), Ok(4));

    let mut buf = [0u8; 4];
    assert_eq!(table.read(fd, &mut buf), Ok(4));
    assert_eq!(&buf, b"1234");
    table.close(fd).unwrap();
}

#[test]
fn device_driver_thread() {
    let ctx = Context::new(Config::default());
    let table = &ctx.table;
    table
        .install_device("/dev/ttyS1", Uart { worker: None })
        .unwrap();

    let fd = table.open("/dev/ttyS1", OpenFlags::RDWR, 16).unwrap();
    assert_eq!(table.write(fd, b"hello"), Ok(5));

    let mut got = Vec::new();
    let mut buf = [0u8; 8];
    while got.len() < 5 {
        let n = table.read(fd, &mut buf).unwrap();
        assert_ne!(n, 0, "timed out after {got:?}");
        got.extend_from_slice(&buf[..n]);
    }
    assert_eq!(got, b"HELLO");
    table.close(fd).unwrap();
}

#[test]
fn devices_survive_reopen() {
    let ctx = Context::new(Config::default());
    let table = &ctx.table;
    table.install_device("/dev/a", Loopback).unwrap();
    table.install_device("/dev/b", Loopback).unwrap();

    let a = table.open("/dev/a", OpenFlags::RDWR, 2).unwrap();
    let b = table.open("/dev/b", OpenFlags::RDWR, 2).unwrap();
    assert_ne!(table.device_id(a), table.device_id(b));
    assert_eq!(table.open("/dev/a", OpenFlags::RDWR, 2), Err(Error::Busy));

    table.close(a).unwrap();
    table.close(b).unwrap();
    let a = table.open("/dev/a", OpenFlags::RDONLY, 2).unwrap();
    assert_eq!(a, 3);
}

#[test]
fn concurrent_clients() {
    let ctx = Context::new(Config::with_files(8));
    let table = Arc::new(ctx.table);

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let table = table.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let path = format!("/worker{t}");
                    let fd = table
                        .open(&path, OpenFlags::WRONLY | OpenFlags::CREATE, 0)
                        .unwrap();
                    table.write(fd, &[i]).unwrap();
                    table.close(fd).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(table.count(), Ok(0));
    for t in 0..4 {
        assert_eq!(table.stat(&format!("/worker{t}")).unwrap().size, 1);
    }
}
