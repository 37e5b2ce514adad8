//! Durable output sinks for serialized log records.
//!
//! A [`Sink`] is the capability the batching writer needs: append bytes, then
//! force them past in-process buffers. [`FileSink`] is the primary durable
//! destination; [`ConsoleSink`] is an unbuffered diagnostic echo that the
//! producer path writes to directly, bypassing the batching writer;
//! [`MemorySink`] backs the test suite.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Internal buffer in front of the log file, sized to keep syscall overhead
/// low at high record rates.
const FILE_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Append-bytes-durably capability used by the batching writer.
#[async_trait]
pub trait Sink: Send {
    /// Append raw bytes to the destination.
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Ensure previously appended bytes reach the underlying storage, not
    /// just an in-process buffer.
    async fn flush(&mut self) -> io::Result<()>;
}

/// Durable file sink: append mode behind a large write buffer, with an
/// OS-level sync on every flush.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) the destination file in append mode, creating the
    /// parent directory if needed.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;

        Ok(Self {
            writer: BufWriter::with_capacity(FILE_BUFFER_CAPACITY, file),
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_data().await
    }
}

/// Unbuffered console echo.
///
/// Producers write each record to stdout at emission time; there is no
/// batching contract here, so the sink also works through a shared reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Write one record line to stdout immediately.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        use std::io::Write;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(line.as_bytes())?;
        handle.write_all(b"\n")?;
        handle.flush()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        use std::io::Write;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(bytes)
    }

    async fn flush(&mut self) -> io::Result<()> {
        use std::io::Write;

        io::stdout().lock().flush()
    }
}

/// In-memory sink recording every append and flush, for tests.
///
/// Cheap to clone; all clones share the same state, so a test can keep one
/// handle while the writer consumes another.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    appends: Vec<Vec<u8>>,
    flushes: u64,
    fail_next_append: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `append` call fail with a broken-pipe error.
    pub fn fail_next_append(&self) {
        self.state.lock().unwrap().fail_next_append = true;
    }

    /// All appended chunks, in order. One chunk per writer flush.
    pub fn appends(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().appends.clone()
    }

    /// All appended bytes concatenated.
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().unwrap().appends.concat()
    }

    /// Number of durability flushes observed.
    pub fn flushes(&self) -> u64 {
        self.state.lock().unwrap().flushes
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_append {
            state.fail_next_append = false;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink failure"));
        }
        state.appends.push(bytes.to_vec());
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_sink_appends_and_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut sink = FileSink::open(&path).await.unwrap();
        sink.append(b"line one\n").await.unwrap();
        sink.append(b"line two\n").await.unwrap();
        sink.flush().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "line one\nline two\n");
    }

    #[tokio::test]
    async fn test_file_sink_appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        {
            let mut sink = FileSink::open(&path).await.unwrap();
            sink.append(b"first\n").await.unwrap();
            sink.flush().await.unwrap();
        }
        {
            let mut sink = FileSink::open(&path).await.unwrap();
            sink.append(b"second\n").await.unwrap();
            sink.flush().await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_file_sink_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/app.log");

        let mut sink = FileSink::open(&path).await.unwrap();
        sink.append(b"x\n").await.unwrap();
        sink.flush().await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_memory_sink_records_appends_in_order() {
        let sink = MemorySink::new();
        let mut writer_handle = sink.clone();

        writer_handle.append(b"a\n").await.unwrap();
        writer_handle.append(b"b\n").await.unwrap();
        writer_handle.flush().await.unwrap();

        assert_eq!(sink.appends(), vec![b"a\n".to_vec(), b"b\n".to_vec()]);
        assert_eq!(sink.contents(), b"a\nb\n");
        assert_eq!(sink.flushes(), 1);
    }

    #[tokio::test]
    async fn test_memory_sink_injected_failure_is_one_shot() {
        let sink = MemorySink::new();
        let mut writer_handle = sink.clone();

        sink.fail_next_append();
        assert!(writer_handle.append(b"lost\n").await.is_err());
        assert!(writer_handle.append(b"kept\n").await.is_ok());
        assert_eq!(sink.contents(), b"kept\n");
    }
}
