use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// The most bytes read from a marker file when discovering its device.
pub const MARKER_READ_LEN: usize = 32;

/// On-disk contents of a device marker file: the device's registry index.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Marker {
    index: u8,
}

impl Marker {
    /// Returns `None` if `index` does not fit in a marker.
    pub fn new(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(|index| Self { index })
    }

    /// Reads a marker from the start of `bytes`. Extra bytes are ignored.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from_prefix(bytes).ok().map(|(marker, _)| marker)
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}
