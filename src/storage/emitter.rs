//! Append-only JSONL record writer.
//!
//! Each record is serialized into a complete buffer (JSON + `\n`) before a
//! single `write_all` commits it, so an interrupted run leaves a prefix of
//! complete lines. Files are opened in append mode and never truncated.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::config::OutputSink;
use crate::error::ProbeError;
use crate::storage::model::{Record, Snapshot};

/// Writes records to a single-writer sink in order.
pub struct RecordEmitter<W: Write> {
    writer: W,
    records_written: usize,
}

impl RecordEmitter<Box<dyn Write + Send>> {
    /// Opens the configured sink.
    ///
    /// Failing to open is a `SinkWrite` error: without a sink nothing can be
    /// recorded, so callers abort before collecting.
    pub fn open(sink: &OutputSink) -> Result<Self, ProbeError> {
        let writer: Box<dyn Write + Send> = match sink {
            OutputSink::Stdout => Box::new(io::stdout()),
            OutputSink::File(path) => Box::new(open_append(path).map_err(|e| {
                ProbeError::SinkWrite(format!("cannot open {}: {}", path.display(), e))
            })?),
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write> RecordEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    /// Number of records committed so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Serializes and commits one record.
    pub fn emit(&mut self, record: &Record) -> Result<(), ProbeError> {
        let mut line = serde_json::to_vec(record).map_err(|e| {
            ProbeError::SinkWrite(format!("cannot serialize {} record: {}", record.kind, e))
        })?;
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| ProbeError::SinkWrite(format!("{} record: {}", record.kind, e)))?;

        self.records_written += 1;
        debug!(kind = %record.kind, bytes = line.len(), "record committed");
        Ok(())
    }

    /// Emits every outcome of `snapshot` in order, stopping at the first
    /// sink failure.
    pub fn emit_snapshot(&mut self, snapshot: &Snapshot) -> Result<usize, ProbeError> {
        for record in snapshot.records() {
            self.emit(&record)?;
        }
        Ok(self.records_written)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Opens `path` for appending, creating it if needed.
///
/// If an earlier writer died mid-line, a newline is written first so the
/// next record starts on its own line.
fn open_append(path: &Path) -> io::Result<File> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;

    if file.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            file.write_all(b"\n")?;
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::model::{CollectorKind, Facts, Outcome, SCHEMA_VERSION};
    use chrono::Utc;

    fn snapshot(kinds: &[CollectorKind]) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION,
            host_id: "host-a".to_string(),
            captured_at: Utc::now(),
            outcomes: kinds
                .iter()
                .map(|k| Outcome::ok(*k, Facts::new()))
                .collect(),
        }
    }

    /// Writer that accepts `budget` writes, then fails.
    struct FailingWriter {
        budget: usize,
        written: Vec<u8>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "disk gone"));
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emit_snapshot_one_line_per_outcome() {
        let snap = snapshot(&[CollectorKind::System, CollectorKind::Network]);
        let mut emitter = RecordEmitter::new(Vec::new());
        assert_eq!(emitter.emit_snapshot(&snap).unwrap(), 2);

        let out = String::from_utf8(emitter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(out.ends_with('\n'));
        assert_eq!(Record::from_line(lines[0]).unwrap().kind, CollectorKind::System);
        assert_eq!(Record::from_line(lines[1]).unwrap().kind, CollectorKind::Network);
    }

    #[test]
    fn test_sink_failure_leaves_complete_prefix() {
        let snap = snapshot(&[
            CollectorKind::System,
            CollectorKind::Filesystem,
            CollectorKind::Process,
        ]);
        let mut emitter = RecordEmitter::new(FailingWriter {
            budget: 1,
            written: Vec::new(),
        });

        let err = emitter.emit_snapshot(&snap).unwrap_err();
        assert!(matches!(err, ProbeError::SinkWrite(_)));
        assert_eq!(emitter.records_written(), 1);

        let written = String::from_utf8(emitter.into_inner().written).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.ends_with('\n'));
        assert!(Record::from_line(written.trim_end()).is_ok());
    }

    #[test]
    fn test_file_sink_appends_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.jsonl");
        let sink = OutputSink::File(path.clone());

        for _ in 0..2 {
            let mut emitter = RecordEmitter::open(&sink).unwrap();
            emitter
                .emit_snapshot(&snapshot(&[CollectorKind::System]))
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_file_sink_repairs_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.jsonl");
        std::fs::write(&path, "{\"schemaVersion\":1,\"hostId\":\"x\"").unwrap();

        let mut emitter = RecordEmitter::open(&OutputSink::File(path.clone())).unwrap();
        emitter
            .emit_snapshot(&snapshot(&[CollectorKind::Process]))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(Record::from_line(lines[0]).is_err());
        assert_eq!(Record::from_line(lines[1]).unwrap().kind, CollectorKind::Process);
    }

    #[test]
    fn test_unopenable_sink_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::File(dir.path().join("missing-dir").join("probe.jsonl"));
        let err = RecordEmitter::open(&sink).err().unwrap();
        assert!(matches!(err, ProbeError::SinkWrite(_)));
    }
}
