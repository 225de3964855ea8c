//! Subscriber setup.

use std::io::{self, IsTerminal, Write};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level.parse().unwrap_or_default());
    if io::stdout().is_terminal() {
        // Raw mode disables output post-processing, so bare newlines would
        // not return the cursor while key input is active.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(|| CrLf(io::stdout()))
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Writes `\n` as `\r\n`.
struct CrLf<W>(W);

impl<W: Write> Write for CrLf<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = buf.split(|b| *b == b'\n');
        if let Some(first) = lines.next() {
            self.0.write_all(first)?;
        }
        for line in lines {
            self.0.write_all(b"\r\n")?;
            self.0.write_all(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
