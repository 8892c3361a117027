use std::time::Duration;

/// Default number of descriptor table slots.
pub const FILE_TABLE_LENGTH: usize = 16;

/// Default number of device registry slots.
pub const DEVICE_TABLE_LENGTH: usize = 8;

/// Descriptor number of the first table slot. 0, 1 and 2 are the console.
pub const FILE_TABLE_OFFSET: i32 = 3;

/// Directory holding device marker files.
pub const DEVICE_INTERFACE_DIRECTORY: &str = "/dev";

/// How long a blocking device transfer waits for its first byte.
pub const DEVICE_TIMEOUT: Duration = Duration::from_millis(1000);

/// How long a caller waits for the table lock before giving up.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Sizing and timing of a [DescriptorTable](crate::table::DescriptorTable).
#[derive(Debug, Clone)]
pub struct Config {
    pub files: usize,
    pub devices: usize,
    pub offset: i32,
    pub device_dir: String,
    pub device_timeout: Duration,
    pub lock_timeout: Duration,
    /// Seconds added to the hardware clock by [Clock](crate::time::Clock).
    pub timezone_offset: i64,
}

impl Config {
    /// Returns a config with `files` table slots and the remaining defaults.
    pub fn with_files(files: usize) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            files: FILE_TABLE_LENGTH,
            devices: DEVICE_TABLE_LENGTH,
            offset: FILE_TABLE_OFFSET,
            device_dir: DEVICE_INTERFACE_DIRECTORY.to_string(),
            device_timeout: DEVICE_TIMEOUT,
            lock_timeout: LOCK_TIMEOUT,
            timezone_offset: 0,
        }
    }
}
