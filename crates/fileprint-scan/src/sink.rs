//! Serialized, append-only output log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use fileprint_core::{FileRecord, IndexError, RECORD_HEADER};

/// Single serialization point for output records.
///
/// Every record is written under one lock acquisition, so lines from
/// concurrent workers never interleave.
pub struct ResultSink<W: Write> {
    state: Mutex<SinkState<W>>,
    label: PathBuf,
}

struct SinkState<W: Write> {
    writer: BufWriter<W>,
    records: u64,
}

impl ResultSink<File> {
    /// Open the output log at `path`.
    ///
    /// Truncates an existing file unless `append` is set. When appending to
    /// a non-empty file the header is not repeated.
    pub fn create(path: &Path, append: bool) -> Result<Self, IndexError> {
        let file = if append {
            OpenOptions::new().create(true).append(true).open(path)
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
        }
        .map_err(|e| IndexError::output(path, e))?;

        let existing = file
            .metadata()
            .map_err(|e| IndexError::output(path, e))?
            .len();

        if existing > 0 {
            warn!(
                path = %path.display(),
                bytes = existing,
                "appending to existing output, earlier records are kept"
            );
            Ok(Self::resume(file, path))
        } else {
            Self::new(file, path)
        }
    }
}

impl<W: Write> ResultSink<W> {
    /// Wrap a writer and write the header record.
    ///
    /// The header is flushed before this returns, so it always precedes
    /// every data record.
    pub fn new(writer: W, label: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let sink = Self::resume(writer, label);
        {
            let mut state = sink.lock();
            writeln!(state.writer, "{RECORD_HEADER}")
                .and_then(|()| state.writer.flush())
                .map_err(|e| IndexError::output(&sink.label, e))?;
        }
        debug!(output = %sink.label.display(), "wrote header");
        Ok(sink)
    }

    /// Wrap a writer that already holds a header.
    pub fn resume(writer: W, label: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer: BufWriter::new(writer),
                records: 0,
            }),
            label: label.into(),
        }
    }

    /// Path or name of the output, used in error messages.
    pub fn label(&self) -> &Path {
        &self.label
    }

    /// Append one record.
    pub fn append(&self, record: &FileRecord) -> Result<(), IndexError> {
        self.append_line(&record.to_line())
    }

    /// Append one pre-formatted line.
    ///
    /// The line must already end with a newline.
    pub fn append_line(&self, line: &str) -> Result<(), IndexError> {
        let mut state = self.lock();
        state
            .writer
            .write_all(line.as_bytes())
            .map_err(|e| IndexError::output(&self.label, e))?;
        state.records += 1;
        Ok(())
    }

    /// Number of records appended so far.
    pub fn records_written(&self) -> u64 {
        self.lock().records
    }

    /// Flush buffered records and return the count and the inner writer.
    pub fn finish(self) -> Result<(u64, W), IndexError> {
        let label = self.label;
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let writer = state
            .writer
            .into_inner()
            .map_err(|e| IndexError::output(&label, e.into_error()))?;
        Ok((state.records, writer))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fileprint_core::ContentHash;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn record(n: usize) -> FileRecord {
        FileRecord::new(
            format!("/data/file-{n}.txt"),
            ContentHash::new([n as u8; 32]),
            Utc::now(),
        )
    }

    #[test]
    fn test_header_written_first() {
        let sink = ResultSink::new(Vec::new(), "memory").unwrap();
        sink.append(&record(1)).unwrap();
        let (count, buf) = sink.finish().unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(count, 1);
        assert_eq!(text.lines().next(), Some(RECORD_HEADER));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_empty_sink_holds_only_header() {
        let sink = ResultSink::new(Vec::new(), "memory").unwrap();
        let (count, buf) = sink.finish().unwrap();
        assert_eq!(count, 0);
        assert_eq!(String::from_utf8(buf).unwrap(), format!("{RECORD_HEADER}\n"));
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let sink = Arc::new(ResultSink::new(Vec::new(), "memory").unwrap());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        sink.append(&record(t * per_thread + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let sink = Arc::try_unwrap(sink).ok().unwrap();
        let (count, buf) = sink.finish().unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(count, (threads * per_thread) as u64);
        let data: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(data.len(), threads * per_thread);
        for line in data {
            let (path, hash, _) = FileRecord::split_line(line).unwrap();
            assert!(path.starts_with("/data/file-"));
            assert_eq!(hash.len(), 64);
        }
    }

    #[test]
    fn test_create_truncates_by_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("files.csv");
        std::fs::write(&path, "stale line\n").unwrap();

        let sink = ResultSink::create(&path, false).unwrap();
        sink.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{RECORD_HEADER}\n"));
    }

    #[test]
    fn test_create_append_keeps_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("files.csv");

        let first = ResultSink::create(&path, true).unwrap();
        first.append(&record(1)).unwrap();
        first.finish().unwrap();

        let second = ResultSink::create(&path, true).unwrap();
        second.append(&record(2)).unwrap();
        second.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], RECORD_HEADER);
        assert!(lines[2].starts_with("/data/file-2.txt"));
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("no/such/dir/files.csv");
        let err = ResultSink::create(&path, false).err().unwrap();
        assert!(matches!(err, IndexError::OutputWrite { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("files.csv"));
    }

    #[test]
    fn test_label_names_output() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("files.csv");

        let sink = ResultSink::create(&path, false).unwrap();
        assert_eq!(sink.label(), path.as_path());
        assert_eq!(ResultSink::new(Vec::new(), "memory").unwrap().label(), Path::new("memory"));
    }
}
