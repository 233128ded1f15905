//! Append-only sinks for flushed batches.

use crate::{error::ConfigError, job::Strength, status::Artifact};
use core::{fmt, str::FromStr};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Initial capacity of the buffer [`FileSink`] renders a batch into.
pub const SINK_BUFFER_BYTES: usize = 8 * 1024;

/// Default file name prefix for streamed artifacts.
pub const DEFAULT_FILE_PREFIX: &str = "seed_phrases";

/// Destination of flushed batches.
///
/// A sink receives whole batches, in the order the coordinator flushes them,
/// and must not reorder or deduplicate records. `write_batch` returns only
/// once the batch is durable; an error means the batch is not persisted.
pub trait Sink: Send {
    fn write_batch(&mut self, batch: &[Artifact]) -> io::Result<()>;

    /// Flushes and releases the destination. Called once on every exit path.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Human readable destination, used in logs and errors.
    fn target(&self) -> String;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_batch(&mut self, batch: &[Artifact]) -> io::Result<()> {
        (**self).write_batch(batch)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn target(&self) -> String {
        (**self).target()
    }
}

/// How one artifact is rendered as a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// The phrase only.
    #[default]
    Plain,
    /// `phrase \t standard \t network \t address \t origin`, with `-` for
    /// absent fields.
    Tsv,
    /// One JSON object per line with every [`Artifact`] field.
    Json,
}

impl RecordFormat {
    /// Writes one newline-terminated record.
    pub fn write_record<W: Write>(self, out: &mut W, artifact: &Artifact) -> io::Result<()> {
        match self {
            Self::Plain => writeln!(out, "{}", artifact.phrase),
            Self::Tsv => writeln!(
                out,
                "{}\t{}\t{}\t{}\t{:?}",
                artifact.phrase,
                artifact.standard,
                artifact.network.map_or("-", |n| n.tag()),
                artifact.address.as_deref().unwrap_or("-"),
                artifact.origin,
            ),
            Self::Json => {
                serde_json::to_writer(&mut *out, artifact)?;
                writeln!(out)
            }
        }
    }
}

impl FromStr for RecordFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Tsv => "tsv",
            Self::Json => "json",
        })
    }
}

/// File that receives artifacts of `strength`: `<dir>/<prefix>_<words>words.txt`.
///
/// Keying the name on the word count keeps runs with different strengths
/// out of each other's files.
pub fn sink_path(dir: &Path, prefix: &str, strength: Strength) -> PathBuf {
    dir.join(format!("{prefix}_{}words.txt", strength.word_count()))
}

/// The file operations [`FileSink`] needs.
pub trait AppendTarget: Write + Send {
    /// Offset one past the last byte written.
    fn end_offset(&self) -> io::Result<u64>;

    /// Cuts the target back to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Makes everything written so far durable.
    fn sync(&self) -> io::Result<()>;
}

impl AppendTarget for File {
    fn end_offset(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Append-only file sink.
///
/// A batch is rendered into memory first and then appended with a single
/// `write_all` followed by `sync_data`. If any part of that fails the file
/// is truncated back to its length before the batch, so the file only ever
/// holds whole batches.
pub struct FileSink<F = File> {
    path: PathBuf,
    file: F,
    format: RecordFormat,
    staged: Vec<u8>,
}

impl FileSink {
    /// Opens (or creates) `path` in append mode. Missing parent directories
    /// are created.
    pub fn open(path: impl Into<PathBuf>, format: RecordFormat) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self::with_target(path, file, format))
    }
}

impl<F: AppendTarget> FileSink<F> {
    /// Wraps an already opened target. `path` is only used for display.
    pub fn with_target(path: impl Into<PathBuf>, file: F, format: RecordFormat) -> Self {
        Self {
            path: path.into(),
            file,
            format,
            staged: Vec::with_capacity(SINK_BUFFER_BYTES),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_staged(&mut self) -> io::Result<()> {
        self.file.write_all(&self.staged)?;
        self.file.flush()?;
        self.file.sync()
    }
}

impl<F: AppendTarget> Sink for FileSink<F> {
    fn write_batch(&mut self, batch: &[Artifact]) -> io::Result<()> {
        self.staged.clear();
        for artifact in batch {
            self.format.write_record(&mut self.staged, artifact)?;
        }

        let start = self.file.end_offset()?;
        let appended = self.append_staged();
        if appended.is_err() {
            if let Err(e) = self.file.truncate(start) {
                tracing::error!(
                    "Failed to roll {} back to {start} bytes: {e}",
                    self.path.display()
                );
            }
        }
        self.staged.clear();
        appended
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.sync()
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }
}

impl<F> fmt::Debug for FileSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Accepts and discards every batch. Used when persistence is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn write_batch(&mut self, _batch: &[Artifact]) -> io::Result<()> {
        Ok(())
    }

    fn target(&self) -> String {
        "<discarded>".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::job::{JobDescriptor, Network};
    use std::sync::{Arc, Mutex};

    /// Records every batch in memory; optionally fails on the n-th write.
    #[derive(Clone, Default)]
    pub(crate) struct MemorySink {
        pub batches: Arc<Mutex<Vec<Vec<String>>>>,
        pub fail_on_write: Option<usize>,
        pub closed: Arc<Mutex<bool>>,
    }

    impl MemorySink {
        pub fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn records(&self) -> Vec<String> {
            self.batches().concat()
        }

        pub fn is_closed(&self) -> bool {
            *self.closed.lock().unwrap()
        }
    }

    impl Sink for MemorySink {
        fn write_batch(&mut self, batch: &[Artifact]) -> io::Result<()> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on_write == Some(batches.len()) {
                return Err(io::Error::other("disk full"));
            }
            batches.push(batch.iter().map(|a| a.phrase.clone()).collect());
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }

        fn target(&self) -> String {
            "memory".to_string()
        }
    }

    /// In-memory file that accepts `budget` more bytes and then fails every
    /// write, like a full disk.
    #[derive(Default)]
    struct FlakyFile {
        bytes: Vec<u8>,
        budget: Option<usize>,
    }

    impl Write for FlakyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.budget {
                Some(0) => return Err(io::Error::other("no space left on device")),
                Some(left) => buf.len().min(left),
                None => buf.len(),
            };
            self.bytes.extend_from_slice(&buf[..n]);
            if let Some(left) = self.budget.as_mut() {
                *left -= n;
            }
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl AppendTarget for FlakyFile {
        fn end_offset(&self) -> io::Result<u64> {
            Ok(self.bytes.len() as u64)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            self.bytes.truncate(len as usize);
            Ok(())
        }

        fn sync(&self) -> io::Result<()> {
            Ok(())
        }
    }

    fn artifacts(names: &[&str]) -> Vec<Artifact> {
        names
            .iter()
            .map(|n| Artifact::baseline((*n).to_string(), Strength::Bits128))
            .collect()
    }

    #[test]
    fn writes_one_line_per_artifact_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = sink_path(dir.path(), DEFAULT_FILE_PREFIX, Strength::Bits128);
        let mut sink = FileSink::open(&path, RecordFormat::Plain).unwrap();

        sink.write_batch(&artifacts(&["one two", "three four"])).unwrap();
        sink.write_batch(&artifacts(&["five six"])).unwrap();
        sink.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "one two\nthree four\nfive six\n");
        assert!(path.ends_with("seed_phrases_12words.txt"));
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = sink_path(dir.path(), "fast_seeds", Strength::Bits256);

        for run in ["first", "second"] {
            let mut sink = FileSink::open(&path, RecordFormat::Plain).unwrap();
            sink.write_batch(&artifacts(&[run])).unwrap();
            sink.close().unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/seeds.txt");
        let mut sink = FileSink::open(&path, RecordFormat::Plain).unwrap();
        sink.write_batch(&artifacts(&["x"])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn different_strengths_never_share_a_file() {
        let dir = Path::new("out");
        assert_ne!(
            sink_path(dir, DEFAULT_FILE_PREFIX, Strength::Bits128),
            sink_path(dir, DEFAULT_FILE_PREFIX, Strength::Bits256)
        );
    }

    #[test]
    fn tsv_renders_derived_fields() {
        let job = JobDescriptor::bip44(Strength::Bits128, Network::Ethereum);
        let artifact = Artifact::for_job("a b".to_string(), &job, Some("0xabc".to_string()));
        let mut out = Vec::new();
        RecordFormat::Tsv.write_record(&mut out, &artifact).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a b\tBIP44\tETH\t0xabc\tPrimary\n"
        );

        let baseline = Artifact::baseline("c d".to_string(), Strength::Bits128);
        let mut out = Vec::new();
        RecordFormat::Tsv.write_record(&mut out, &baseline).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "c d\tBIP39\t-\t-\tPrimary\n");
    }

    #[test]
    fn failed_append_leaves_only_whole_batches() {
        let mut sink = FileSink::with_target("flaky", FlakyFile::default(), RecordFormat::Plain);
        sink.write_batch(&artifacts(&["one two"])).unwrap();

        // Larger than the staging capacity, and the device fills up mid-way.
        let big: Vec<String> = (0..2_000).map(|i| format!("word{i} word{i}")).collect();
        let big: Vec<&str> = big.iter().map(String::as_str).collect();
        sink.file.budget = Some(SINK_BUFFER_BYTES + 5);
        let err = sink.write_batch(&artifacts(&big)).unwrap_err();
        assert_eq!(err.to_string(), "no space left on device");
        assert_eq!(sink.file.bytes, b"one two\n");

        sink.close().unwrap();
        assert_eq!(sink.file.bytes, b"one two\n");

        sink.file.budget = None;
        sink.write_batch(&artifacts(&["three four"])).unwrap();
        assert_eq!(sink.file.bytes, b"one two\nthree four\n");
    }

    #[test]
    fn json_writes_one_object_per_line() {
        let job = JobDescriptor::bip44(Strength::Bits128, Network::Bitcoin);
        let artifact = Artifact::for_job("a b".to_string(), &job, Some("1abc".to_string()));
        let mut out = Vec::new();
        RecordFormat::Json.write_record(&mut out, &artifact).unwrap();
        RecordFormat::Json
            .write_record(&mut out, &Artifact::baseline("c d".to_string(), Strength::Bits256))
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["phrase"], "a b");
        assert_eq!(lines[0]["standard"], "BIP44");
        assert_eq!(lines[0]["network"], "BTC");
        assert_eq!(lines[0]["address"], "1abc");
        assert_eq!(lines[0]["origin"], "Primary");
        assert!(lines[1]["network"].is_null());
        assert_eq!("JSON".parse::<RecordFormat>().unwrap(), RecordFormat::Json);
    }
}
