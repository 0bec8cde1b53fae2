//! Run Reader
//!
//! Decodes records section by section from the spill file, one cursor
//! (read buffer + optional decompressor) per section.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::sync::Arc;

use bytes::Buf;
use parking_lot::Mutex;

use crate::error::Result;
use crate::record::{Record, RecordPool};
use crate::SortError;

use super::codec::Codec;
use super::{SectionMeta, FRAME_HEADER_SIZE};

/// Buffered view of one section's stored bytes, as handed to codecs
pub type SectionReader = BufReader<SectionSource>;

/// Read position shared between a section source and its cursor
struct SourceState {
    position: u64,
    hasher: crc32fast::Hasher,
}

/// Positional reader over `[start, end)` of the spill file
///
/// Every byte handed out is folded into the section checksum.
pub struct SectionSource {
    file: Arc<File>,
    end: u64,
    state: Arc<Mutex<SourceState>>,
}

impl Read for SectionSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let remaining = self.end.saturating_sub(state.position);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(remaining as usize);
        let n = read_at(&self.file, &mut buf[..want], state.position)?;
        state.hasher.update(&buf[..n]);
        state.position += n as u64;
        Ok(n)
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

/// Decode state for one section
struct SectionCursor {
    decoder: Box<dyn Read + Send>,
    state: Arc<Mutex<SourceState>>,
    /// Records not yet decoded
    remaining: u64,
}

/// Random-access reader over every committed section
pub struct RunReader {
    file: Option<Arc<File>>,
    sections: Vec<SectionMeta>,
    cursors: Vec<Option<SectionCursor>>,
    pool: RecordPool,
}

impl RunReader {
    /// Open one cursor per section
    ///
    /// `read_buffer` is the capacity of each section's read buffer, so the
    /// merge holds roughly `sections × read_buffer` bytes of buffers.
    pub fn open(
        file: File,
        sections: Vec<SectionMeta>,
        codec: Option<Arc<dyn Codec>>,
        read_buffer: usize,
        pool: RecordPool,
    ) -> Result<Self> {
        let file = Arc::new(file);
        let mut cursors = Vec::with_capacity(sections.len());

        for meta in &sections {
            if meta.is_empty() {
                cursors.push(None);
                continue;
            }

            let state = Arc::new(Mutex::new(SourceState {
                position: meta.start,
                hasher: crc32fast::Hasher::new(),
            }));
            let source = SectionSource {
                file: Arc::clone(&file),
                end: meta.end,
                state: Arc::clone(&state),
            };
            let buffered = BufReader::with_capacity(read_buffer, source);
            let decoder: Box<dyn Read + Send> = match &codec {
                Some(codec) => codec.decoder(buffered)?,
                None => Box::new(buffered),
            };

            cursors.push(Some(SectionCursor {
                decoder,
                state,
                remaining: meta.records,
            }));
        }

        Ok(Self {
            file: Some(file),
            sections,
            cursors,
            pool,
        })
    }

    /// Number of committed sections
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Section metadata in flush order
    pub fn sections(&self) -> &[SectionMeta] {
        &self.sections
    }

    /// Decode the next record of `section`
    ///
    /// Returns `Ok(None)` once the section is exhausted. The returned record
    /// comes from the pool and belongs to the caller.
    ///
    /// The section checksum is verified only when the section is exhausted,
    /// so records from a corrupted section can be returned before the error
    /// surfaces; only the final call is the integrity verdict.
    pub fn read_next(&mut self, section: usize) -> Result<Option<Record>> {
        let Some(cursor) = self.cursors.get_mut(section).and_then(Option::as_mut) else {
            return Ok(None);
        };

        if cursor.remaining == 0 {
            let cursor = self.cursors[section].take();
            if let Some(cursor) = cursor {
                self.verify_checksum(section, cursor)?;
            }
            return Ok(None);
        }

        let meta = self.sections[section];
        let mut header = [0u8; FRAME_HEADER_SIZE];
        read_frame(cursor.decoder.as_mut(), &mut header, section)?;

        let mut buf = &header[..];
        let key_len = buf.get_u32_le() as u64;
        let value_len = buf.get_u32_le() as u64;
        if key_len + value_len > meta.max_frame {
            return Err(SortError::corruption(
                section,
                format!(
                    "frame of {} bytes exceeds the section maximum of {}",
                    key_len + value_len,
                    meta.max_frame
                ),
            ));
        }

        let mut record = self.pool.acquire();
        let frame = record.frame_mut(key_len as usize, value_len as usize);
        if let Err(e) = read_frame(cursor.decoder.as_mut(), frame, section) {
            self.pool.release(record);
            return Err(e);
        }

        cursor.remaining -= 1;
        Ok(Some(record))
    }

    /// Drop every cursor and the file handle. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.cursors.clear();
        self.file = None;
        Ok(())
    }

    /// Hash whatever the decoder left unread and compare with the stored CRC
    fn verify_checksum(&self, section: usize, cursor: SectionCursor) -> Result<()> {
        let meta = self.sections[section];
        drop(cursor.decoder);

        let Some(file) = &self.file else {
            return Ok(());
        };
        let mut state = cursor.state.lock();
        let mut chunk = vec![0u8; 8 * 1024];
        while state.position < meta.end {
            let want = chunk.len().min((meta.end - state.position) as usize);
            let n = read_at(file, &mut chunk[..want], state.position)?;
            if n == 0 {
                return Err(SortError::corruption(section, "spill file is truncated"));
            }
            state.hasher.update(&chunk[..n]);
            state.position += n as u64;
        }

        let actual = state.hasher.clone().finalize();
        if actual != meta.crc32 {
            return Err(SortError::corruption(
                section,
                format!(
                    "checksum mismatch: expected {:08x}, got {:08x}",
                    meta.crc32, actual
                ),
            ));
        }
        Ok(())
    }
}

/// Fill `buf` from a section, mapping a short read to corruption
fn read_frame(decoder: &mut (dyn Read + Send), buf: &mut [u8], section: usize) -> Result<()> {
    decoder.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            SortError::corruption(section, "section ended in the middle of a record")
        }
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            SortError::corruption(section, format!("undecodable section data: {}", e))
        }
        _ => SortError::Io(e),
    })
}
