use bitflags::bitflags;

bitflags! {
    /// Flags accepted by [open](crate::table::DescriptorTable::open).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const APPEND = 1 << 2;
        const CREATE = 1 << 3;
        const TRUNCATE = 1 << 4;
        const NONBLOCK = 1 << 5;

        const RDONLY = Self::READ.bits();
        const WRONLY = Self::WRITE.bits();
        const RDWR = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl OpenFlags {
    /// Returns the flags with an access mode filled in.
    /// Flags naming neither direction are read-only, as `O_RDONLY` is zero.
    pub fn normalized(self) -> Self {
        if self.intersects(Self::RDWR) {
            self
        } else {
            self | Self::READ
        }
    }

    pub fn readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn writable(self) -> bool {
        self.contains(Self::WRITE)
    }
}
