//! Line-discipline settings exchanged with device drivers.

pub type TcFlag = u32;
pub type Speed = u32;
pub type Cc = u8;

pub const NCCS: usize = 1;

// c_iflag
pub const IGNBRK: TcFlag = 0o000001;
pub const BRKINT: TcFlag = 0o000002;
pub const IGNPAR: TcFlag = 0o000004;
pub const PARMRK: TcFlag = 0o000010;
pub const INPCK: TcFlag = 0o000020;
pub const ISTRIP: TcFlag = 0o000040;
pub const INLCR: TcFlag = 0o000100;
pub const IGNCR: TcFlag = 0o000200;
pub const ICRNL: TcFlag = 0o000400;
pub const IXON: TcFlag = 0o002000;
pub const IXOFF: TcFlag = 0o010000;

// c_oflag
pub const OPOST: TcFlag = 0o000001;
pub const ONLCR: TcFlag = 0o000004;

// c_cflag
pub const CBAUD: TcFlag = 0o010017;
pub const CSIZE: TcFlag = 0o000060;
pub const CS5: TcFlag = 0o000000;
pub const CS6: TcFlag = 0o000020;
pub const CS7: TcFlag = 0o000040;
pub const CS8: TcFlag = 0o000060;
pub const CSTOPB: TcFlag = 0o000100;
pub const CREAD: TcFlag = 0o000200;
pub const PARENB: TcFlag = 0o000400;
pub const PARODD: TcFlag = 0o001000;
pub const HUPCL: TcFlag = 0o002000;
pub const CLOCAL: TcFlag = 0o004000;
pub const CRTSCTS: TcFlag = 0o20000000000;

// c_lflag
pub const ISIG: TcFlag = 0o000001;
pub const ICANON: TcFlag = 0o000002;
pub const ECHO: TcFlag = 0o000010;
pub const ECHOE: TcFlag = 0o000020;
pub const ECHOK: TcFlag = 0o000040;
pub const ECHONL: TcFlag = 0o000100;
pub const NOFLSH: TcFlag = 0o000200;
pub const TOSTOP: TcFlag = 0o000400;
pub const IEXTEN: TcFlag = 0o100000;

// Baud rates, stored in the CBAUD bits of c_cflag.
pub const B0: Speed = 0o000000;
pub const B1200: Speed = 0o000011;
pub const B2400: Speed = 0o000013;
pub const B4800: Speed = 0o000014;
pub const B9600: Speed = 0o000015;
pub const B19200: Speed = 0o000016;
pub const B38400: Speed = 0o000017;
pub const B57600: Speed = 0o010001;
pub const B115200: Speed = 0o010002;
pub const B230400: Speed = 0o010003;
pub const B460800: Speed = 0o010004;
pub const B921600: Speed = 0o010007;

/// When [tcsetattr](crate::table::DescriptorTable::tcsetattr) applies new settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetWhen {
    Now,
    Drain,
    Flush,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Termios {
    pub c_iflag: TcFlag,
    pub c_oflag: TcFlag,
    pub c_cflag: TcFlag,
    pub c_lflag: TcFlag,
    pub c_line: Cc,
    pub c_cc: [Cc; NCCS],
    pub c_ispeed: Speed,
    pub c_ospeed: Speed,
}

impl Termios {
    /// Settings reported for the console.
    pub fn console() -> Self {
        Self {
            c_cflag: B115200 | CS8,
            ..Self::default()
        }
    }

    pub fn output_speed(&self) -> Speed {
        self.c_ospeed
    }

    pub fn input_speed(&self) -> Speed {
        self.c_ispeed
    }

    pub fn set_output_speed(&mut self, speed: Speed) {
        self.c_ospeed = speed;
        self.c_cflag = (self.c_cflag & !CBAUD) | (speed & CBAUD);
    }

    pub fn set_input_speed(&mut self, speed: Speed) {
        self.c_ispeed = speed;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.set_input_speed(speed);
        self.set_output_speed(speed);
    }

    /// Switches to raw mode: no input or output processing, 8-bit characters.
    pub fn make_raw(&mut self) {
        self.c_iflag &= !(IGNBRK | BRKINT | PARMRK | ISTRIP | INLCR | IGNCR | ICRNL | IXON);
        self.c_oflag &= !OPOST;
        self.c_lflag &= !(ECHO | ECHONL | ICANON | ISIG | IEXTEN);
        self.c_cflag &= !(CSIZE | PARENB);
        self.c_cflag |= CS8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_settings() {
        let termios = Termios::console();
        assert_eq!(termios.c_cflag & CSIZE, CS8);
        assert_eq!(termios.c_cflag & CBAUD, B115200 & CBAUD);
    }

    #[test]
    fn set_speed_updates_cflag() {
        let mut termios = Termios::console();
        termios.set_speed(B9600);
        assert_eq!(termios.output_speed(), B9600);
        assert_eq!(termios.input_speed(), B9600);
        assert_eq!(termios.c_cflag & CBAUD, B9600);
        assert_eq!(termios.c_cflag & CSIZE, CS8);
    }

    #[test]
    fn make_raw() {
        let mut termios = Termios {
            c_iflag: ICRNL | IXON,
            c_oflag: OPOST | ONLCR,
            c_lflag: ICANON | ECHO | ISIG,
            c_cflag: CS7 | PARENB,
            ..Termios::default()
        };
        termios.make_raw();
        assert_eq!(termios.c_iflag, 0);
        assert_eq!(termios.c_oflag, ONLCR);
        assert_eq!(termios.c_lflag, 0);
        assert_eq!(termios.c_cflag, CS8);
    }
}
