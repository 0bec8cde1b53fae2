//! Run Writer
//!
//! Appends sorted runs as framed sections to the spill file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::record::Record;
use crate::SortError;

use super::codec::{Codec, PlainEncoder, SectionEncoder};
use super::{RunFile, SectionMeta, FILE_PREFIX};

/// Buffered spill file handle that tracks position and a running CRC
///
/// Codecs receive the sink by value when a section starts and return it
/// from [`SectionEncoder::finish`].
pub struct SpillSink {
    writer: BufWriter<File>,
    position: u64,
    hasher: crc32fast::Hasher,
}

impl SpillSink {
    fn new(file: File) -> Self {
        Self {
            writer: BufWriter::new(file),
            position: 0,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Bytes written so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Finalize the CRC of the bytes written since the last call
    fn take_checksum(&mut self) -> u32 {
        std::mem::take(&mut self.hasher).finalize()
    }
}

impl Write for SpillSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Where the writer is between sections
enum Stage {
    /// No section open
    Idle(SpillSink),
    /// Records are streaming into a section
    Section(Box<dyn SectionEncoder>),
    /// An earlier write or flush failed
    Failed,
}

/// Result of the write phase, handed to the reader
pub struct SpilledRuns {
    pub(crate) file: File,
    /// Committed sections in flush order
    pub sections: Vec<SectionMeta>,
    /// Owner of the on-disk file
    pub run_file: RunFile,
}

/// Writes sorted runs to one temporary file
pub struct RunWriter {
    stage: Stage,
    codec: Option<Arc<dyn Codec>>,
    run_file: RunFile,
    sections: Vec<SectionMeta>,
    /// Start offset of the open section
    section_start: u64,
    /// Records encoded into the open section
    section_records: u64,
    /// Longest frame in the open section
    section_max_frame: u64,
}

impl RunWriter {
    /// Create the spill file in `work_dir`
    pub fn create(work_dir: &Path, codec: Option<Arc<dyn Codec>>, keep: bool) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(".run")
            .tempfile_in(work_dir)
            .map_err(|e| {
                SortError::Config(format!(
                    "cannot create spill file in {}: {}",
                    work_dir.display(),
                    e
                ))
            })?;
        let (file, temp_path) = temp.into_parts();

        tracing::debug!(
            path = %temp_path.display(),
            codec = codec.as_ref().map(|c| c.name()).unwrap_or("none"),
            "created spill file"
        );

        Ok(Self {
            stage: Stage::Idle(SpillSink::new(file)),
            codec,
            run_file: RunFile::new(temp_path, keep),
            sections: Vec::new(),
            section_start: 0,
            section_records: 0,
            section_max_frame: 0,
        })
    }

    /// Append one record to the open section (opening it if needed)
    pub fn encode(&mut self, record: &Record) -> Result<()> {
        let key_len = frame_len(record.key_len())?;
        let value_len = frame_len(record.value_len())?;

        let mut encoder = match std::mem::replace(&mut self.stage, Stage::Failed) {
            Stage::Section(encoder) => encoder,
            Stage::Idle(sink) => {
                self.section_start = sink.position();
                match &self.codec {
                    Some(codec) => codec.encoder(sink)?,
                    None => Box::new(PlainEncoder(sink)),
                }
            }
            Stage::Failed => return Err(failed()),
        };

        encoder.write_all(&key_len.to_le_bytes())?;
        encoder.write_all(&value_len.to_le_bytes())?;
        encoder.write_all(record.key())?;
        encoder.write_all(record.value())?;

        self.stage = Stage::Section(encoder);
        self.section_records += 1;
        self.section_max_frame = self.section_max_frame.max(record.byte_size() as u64);
        Ok(())
    }

    /// Finish the open section and commit its boundary
    ///
    /// The section only becomes visible in [`RunWriter::sections`] once
    /// every byte of it has been handed to the OS.
    pub fn flush(&mut self) -> Result<()> {
        let mut sink = match std::mem::replace(&mut self.stage, Stage::Failed) {
            Stage::Section(encoder) => encoder.finish()?,
            Stage::Idle(sink) => {
                self.section_start = sink.position();
                sink
            }
            Stage::Failed => return Err(failed()),
        };
        sink.flush()?;

        let meta = SectionMeta {
            start: self.section_start,
            end: sink.position(),
            records: self.section_records,
            max_frame: self.section_max_frame,
            crc32: sink.take_checksum(),
        };
        self.sections.push(meta);
        self.stage = Stage::Idle(sink);

        self.section_records = 0;
        self.section_max_frame = 0;
        Ok(())
    }

    /// Committed sections in flush order
    pub fn sections(&self) -> &[SectionMeta] {
        &self.sections
    }

    /// Stored bytes written so far (including an open section's buffered bytes)
    pub fn size(&self) -> u64 {
        match &self.stage {
            Stage::Idle(sink) => sink.position(),
            _ => self.sections.last().map(|s| s.end).unwrap_or(0),
        }
    }

    /// Path of the spill file
    pub fn path(&self) -> &Path {
        self.run_file.path()
    }

    /// Remove the spill file unless it is kept. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.stage = Stage::Failed;
        self.run_file.remove()
    }

    /// End the write phase
    ///
    /// An open section is not committed; call [`RunWriter::flush`] first.
    pub fn finish(self) -> Result<SpilledRuns> {
        let sink = match self.stage {
            Stage::Idle(sink) => sink,
            Stage::Section(_) => {
                return Err(SortError::Storage(
                    "spill writer finished with an open section".to_string(),
                ))
            }
            Stage::Failed => return Err(failed()),
        };
        let file = sink.writer.into_inner().map_err(|e| e.into_error())?;

        Ok(SpilledRuns {
            file,
            sections: self.sections,
            run_file: self.run_file,
        })
    }
}

fn frame_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| SortError::RecordTooLarge { len })
}

fn failed() -> SortError {
    SortError::Storage("spill writer is unusable after an earlier failure".to_string())
}
