// src/output/sinks.rs
//! Append-only persistence for the raw and filtered streams

use crate::config::constants::output::{FILTERED_HEADER, RAW_HEADER};
use crate::error::{HolterError, HolterResult, SinkPath};
use crate::hal::{FilteredFrame, SampleFrame};
use csv::Writer;
use parking_lot::Mutex;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Audit-of-record sink: every accepted frame, unmodified
pub trait RawSink: Send {
    fn append(&mut self, frame: &SampleFrame) -> HolterResult<()>;
    fn flush(&mut self) -> HolterResult<()>;
}

/// Sink for the stitched filtered stream
pub trait FilteredSink: Send {
    fn append(&mut self, frames: &[FilteredFrame]) -> HolterResult<()>;
    fn flush(&mut self) -> HolterResult<()>;
}

impl<S: RawSink + ?Sized> RawSink for Box<S> {
    fn append(&mut self, frame: &SampleFrame) -> HolterResult<()> {
        (**self).append(frame)
    }

    fn flush(&mut self) -> HolterResult<()> {
        (**self).flush()
    }
}

impl<S: FilteredSink + ?Sized> FilteredSink for Box<S> {
    fn append(&mut self, frames: &[FilteredFrame]) -> HolterResult<()> {
        (**self).append(frames)
    }

    fn flush(&mut self) -> HolterResult<()> {
        (**self).flush()
    }
}

/// Raw CSV file, flushed after every record
pub struct CsvRawSink {
    writer: Writer<File>,
    path: PathBuf,
}

/// Filtered CSV file, flushed after every batch
pub struct CsvFilteredSink {
    writer: Writer<File>,
    path: PathBuf,
}

fn create_writer(path: &Path, header: &[&str], sink: SinkPath) -> HolterResult<Writer<File>> {
    let mut writer = Writer::from_path(path).map_err(|e| HolterError::sink(sink, "create", e))?;
    writer
        .write_record(header)
        .map_err(|e| HolterError::sink(sink, "write_header", e))?;
    writer.flush().map_err(|e| HolterError::sink(sink, "flush", e))?;
    debug!(path = %path.display(), sink = %sink, "Opened CSV sink");
    Ok(writer)
}

impl CsvRawSink {
    pub fn create(path: impl AsRef<Path>) -> HolterResult<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = create_writer(&path, &RAW_HEADER, SinkPath::Raw)?;
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RawSink for CsvRawSink {
    fn append(&mut self, frame: &SampleFrame) -> HolterResult<()> {
        // Shortest round-trip formatting keeps the values bit-exact
        let record = [
            frame.timestamp.to_string(),
            frame.ecg[0].to_string(),
            frame.ecg[1].to_string(),
            frame.ecg[2].to_string(),
            frame.acc[0].to_string(),
            frame.acc[1].to_string(),
            frame.acc[2].to_string(),
            frame.acc_magnitude.to_string(),
        ];
        self.writer
            .write_record(&record)
            .map_err(|e| HolterError::sink(SinkPath::Raw, "append", e))?;
        self.flush()
    }

    fn flush(&mut self) -> HolterResult<()> {
        self.writer
            .flush()
            .map_err(|e| HolterError::sink(SinkPath::Raw, "flush", e))
    }
}

impl CsvFilteredSink {
    pub fn create(path: impl AsRef<Path>) -> HolterResult<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = create_writer(&path, &FILTERED_HEADER, SinkPath::Filtered)?;
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FilteredSink for CsvFilteredSink {
    fn append(&mut self, frames: &[FilteredFrame]) -> HolterResult<()> {
        for frame in frames {
            let record = [
                frame.timestamp.to_string(),
                frame.ecg[0].to_string(),
                frame.ecg[1].to_string(),
                frame.ecg[2].to_string(),
            ];
            self.writer
                .write_record(&record)
                .map_err(|e| HolterError::sink(SinkPath::Filtered, "append", e))?;
        }
        self.flush()
    }

    fn flush(&mut self) -> HolterResult<()> {
        self.writer
            .flush()
            .map_err(|e| HolterError::sink(SinkPath::Filtered, "flush", e))
    }
}

/// In-memory sink for both streams
///
/// Clones share storage, so a test can hand one clone to a session and read
/// the captured frames through another.
#[derive(Clone, Default)]
pub struct MemorySink {
    raw: Arc<Mutex<Vec<SampleFrame>>>,
    filtered: Arc<Mutex<Vec<FilteredFrame>>>,
    /// Reject appends once this many frames are stored
    capacity: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that fails every append after `frames` stored frames
    pub fn failing_after(frames: usize) -> Self {
        Self {
            capacity: Some(frames),
            ..Self::default()
        }
    }

    pub fn raw_frames(&self) -> Vec<SampleFrame> {
        self.raw.lock().clone()
    }

    pub fn filtered_frames(&self) -> Vec<FilteredFrame> {
        self.filtered.lock().clone()
    }

    fn full(&self, stored: usize, incoming: usize, path: SinkPath) -> HolterResult<()> {
        match self.capacity {
            Some(capacity) if stored + incoming > capacity => Err(HolterError::sink(
                path,
                "append",
                io::Error::new(io::ErrorKind::Other, format!("memory sink full at {capacity} frames")),
            )),
            _ => Ok(()),
        }
    }
}

impl RawSink for MemorySink {
    fn append(&mut self, frame: &SampleFrame) -> HolterResult<()> {
        let mut raw = self.raw.lock();
        self.full(raw.len(), 1, SinkPath::Raw)?;
        raw.push(*frame);
        Ok(())
    }

    fn flush(&mut self) -> HolterResult<()> {
        Ok(())
    }
}

impl FilteredSink for MemorySink {
    fn append(&mut self, frames: &[FilteredFrame]) -> HolterResult<()> {
        let mut filtered = self.filtered.lock();
        self.full(filtered.len(), frames.len(), SinkPath::Filtered)?;
        filtered.extend_from_slice(frames);
        Ok(())
    }

    fn flush(&mut self) -> HolterResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frame(timestamp: u64) -> SampleFrame {
        SampleFrame::new(timestamp, [0.1234567, -0.5, 0.3], [0.01, -0.02, 0.98])
    }

    #[test]
    fn test_raw_csv_has_header_and_exact_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw_data.csv");
        let mut sink = CsvRawSink::create(&path).unwrap();
        for ts in [10, 20] {
            sink.append(&frame(ts)).unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, RAW_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "20");
        let magnitude: f64 = rows[0][7].parse().unwrap();
        assert_eq!(magnitude, frame(10).acc_magnitude);
        let ecg: f64 = rows[0][1].parse().unwrap();
        assert_eq!(ecg, 0.1234567);
    }

    #[test]
    fn test_filtered_csv_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filtered_data.csv");
        let mut sink = CsvFilteredSink::create(&path).unwrap();
        let frames: Vec<FilteredFrame> = (0..5)
            .map(|ts| FilteredFrame {
                timestamp: ts,
                ecg: [ts as f64, 0.0, -1.5],
            })
            .collect();
        sink.append(&frames).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "timestamp,ECG_I_filt,ECG_II_filt,ECG_III_filt");
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5], "4,4,0,-1.5");
    }

    #[test]
    fn test_missing_directory_is_a_sink_error() {
        let dir = TempDir::new().unwrap();
        let err = CsvRawSink::create(dir.path().join("missing").join("raw.csv")).err().unwrap();
        assert!(matches!(err, HolterError::Sink { path: SinkPath::Raw, .. }));
    }

    #[test]
    fn test_memory_sink_clones_share_storage() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        RawSink::append(&mut writer, &frame(1)).unwrap();
        FilteredSink::append(&mut writer, &[FilteredFrame { timestamp: 1, ecg: [0.0; 3] }]).unwrap();

        assert_eq!(sink.raw_frames().len(), 1);
        assert_eq!(sink.filtered_frames().len(), 1);
    }

    #[test]
    fn test_memory_sink_failure_injection() {
        let mut sink = MemorySink::failing_after(2);
        let batch = [FilteredFrame { timestamp: 0, ecg: [0.0; 3] }; 2];
        FilteredSink::append(&mut sink, &batch).unwrap();
        let err = FilteredSink::append(&mut sink, &batch).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(sink.filtered_frames().len(), 2);
    }
}
