use crate::sink::LogSink;
use std::io;

/// A sink that simply drops all lines.
///
/// Useful for measuring the cost of rendering and attribution without any
/// I/O, and for tests that only care that logging does not fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write_line(&self, _line: &[u8]) -> io::Result<()> {
        Ok(())
    }
}
