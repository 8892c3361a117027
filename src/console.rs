use std::io::{self, Read, Write};

/// Character-at-a-time physical I/O behind descriptors 0, 1 and 2.
pub trait Console: Send {
    fn putc(&mut self, c: u8);

    /// Blocks until a character is available.
    fn getc(&mut self) -> u8;
}

/// A console on the host's standard streams.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn putc(&mut self, c: u8) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(&[c]);
        if c == b'\n' {
            let _ = stdout.flush();
        }
    }

    fn getc(&mut self) -> u8 {
        let mut c = [0u8; 1];
        match io::stdin().lock().read(&mut c) {
            Ok(1) => c[0],
            _ => 0,
        }
    }
}
