use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Destination for rendered log lines.
///
/// The logger calls `write_line` exactly once per record, synchronously,
/// from whatever thread issued the log call. Implementations must be
/// safe to share between threads; they provide their own locking.
pub trait LogSink: Send + Sync {
    /// Write one complete line.
    ///
    /// **Parameters**
    /// - `line`: the rendered record, terminating newline included.
    ///
    /// **Returns**
    /// - `Ok(())` if the bytes were handed to the underlying writer.
    /// - `Err(..)` on I/O failure. The logger reports the error on stderr
    ///   and carries on; it never retries.
    fn write_line(&self, line: &[u8]) -> io::Result<()>;

    /// Flush buffered output, if the destination buffers.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(line)
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Process standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(line)
    }
}

/// Any `Write` implementation behind a mutex.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        lock(&self.writer).write_all(line)
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.writer).flush()
    }
}

/// Shared in-memory buffer. Clones write into the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.buffer)).into_owned()
    }

    /// Non-empty lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().filter(|l| !l.is_empty()).map(str::to_string).collect()
    }

    pub fn clear(&self) {
        lock(&self.buffer).clear();
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        lock(&self.buffer).extend_from_slice(line);
        Ok(())
    }
}

/// Writes every line to two sinks.
pub struct FanoutSink {
    primary: Arc<dyn LogSink>,
    secondary: Arc<dyn LogSink>,
}

impl FanoutSink {
    pub fn new(primary: Arc<dyn LogSink>, secondary: Arc<dyn LogSink>) -> Self {
        Self { primary, secondary }
    }
}

impl LogSink for FanoutSink {
    /// Both sinks are always attempted; the first error is returned.
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let first = self.primary.write_line(line);
        let second = self.secondary.write_line(line);
        first.and(second)
    }

    fn flush(&self) -> io::Result<()> {
        let first = self.primary.flush();
        let second = self.secondary.flush();
        first.and(second)
    }
}
