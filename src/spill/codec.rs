//! Section codecs
//!
//! A codec wraps the byte stream of one section: the writer hands it the
//! spill sink when a section starts and takes the sink back when the section
//! is finished; the reader hands it a bounded section source. Concrete codecs
//! come from external crates behind cargo features.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use super::reader::SectionReader;
use super::writer::SpillSink;

/// Pluggable compressor/decompressor pair
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Wrap the sink for one new section
    fn encoder(&self, sink: SpillSink) -> io::Result<Box<dyn SectionEncoder>>;

    /// Wrap one section's stored bytes
    fn decoder(&self, source: SectionReader) -> io::Result<Box<dyn Read + Send>>;
}

/// Write half of a codec for one section
pub trait SectionEncoder: Write + Send {
    /// Terminate the compressed stream and give the sink back
    fn finish(self: Box<Self>) -> io::Result<SpillSink>;
}

/// Built-in codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Records are stored as raw frames
    #[default]
    None,

    /// Gzip via flate2
    #[cfg(feature = "gzip")]
    Gzip,

    /// Framed snappy via snap
    #[cfg(feature = "snappy")]
    Snappy,
}

impl Compression {
    /// Resolve to a codec instance (`None` means uncompressed)
    pub fn codec(self) -> Option<Arc<dyn Codec>> {
        match self {
            Compression::None => None,
            #[cfg(feature = "gzip")]
            Compression::Gzip => Some(Arc::new(GzipCodec::default())),
            #[cfg(feature = "snappy")]
            Compression::Snappy => Some(Arc::new(SnappyCodec)),
        }
    }
}

impl std::str::FromStr for Compression {
    type Err = crate::SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            #[cfg(feature = "gzip")]
            "gzip" | "gz" => Ok(Compression::Gzip),
            #[cfg(feature = "snappy")]
            "snappy" | "snap" => Ok(Compression::Snappy),
            other => Err(crate::SortError::Config(format!(
                "unknown or disabled compression: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Uncompressed
// =============================================================================

/// Pass-through encoder used when no codec is configured
pub(crate) struct PlainEncoder(pub(crate) SpillSink);

impl Write for PlainEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl SectionEncoder for PlainEncoder {
    fn finish(self: Box<Self>) -> io::Result<SpillSink> {
        Ok(self.0)
    }
}

// =============================================================================
// Gzip
// =============================================================================

#[cfg(feature = "gzip")]
pub use gzip::GzipCodec;

#[cfg(feature = "gzip")]
mod gzip {
    use std::io::{self, Read, Write};

    use flate2::bufread::GzDecoder;
    use flate2::write::GzEncoder;

    use super::{Codec, SectionEncoder};
    use crate::spill::reader::SectionReader;
    use crate::spill::writer::SpillSink;

    /// Gzip codec with a configurable level (0-9)
    #[derive(Debug, Clone, Copy)]
    pub struct GzipCodec {
        pub level: u32,
    }

    impl Default for GzipCodec {
        fn default() -> Self {
            Self { level: 6 }
        }
    }

    struct GzipEncoder(GzEncoder<SpillSink>);

    impl Write for GzipEncoder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }

    impl SectionEncoder for GzipEncoder {
        fn finish(self: Box<Self>) -> io::Result<SpillSink> {
            self.0.finish()
        }
    }

    impl Codec for GzipCodec {
        fn name(&self) -> &'static str {
            "gzip"
        }

        fn encoder(&self, sink: SpillSink) -> io::Result<Box<dyn SectionEncoder>> {
            let level = flate2::Compression::new(self.level.min(9));
            Ok(Box::new(GzipEncoder(GzEncoder::new(sink, level))))
        }

        fn decoder(&self, source: SectionReader) -> io::Result<Box<dyn Read + Send>> {
            Ok(Box::new(GzDecoder::new(source)))
        }
    }
}

// =============================================================================
// Snappy
// =============================================================================

#[cfg(feature = "snappy")]
pub use snappy::SnappyCodec;

#[cfg(feature = "snappy")]
mod snappy {
    use std::io::{self, Read, Write};

    use snap::read::FrameDecoder;
    use snap::write::FrameEncoder;

    use super::{Codec, SectionEncoder};
    use crate::spill::reader::SectionReader;
    use crate::spill::writer::SpillSink;

    /// Snappy frame-format codec
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SnappyCodec;

    struct SnappyEncoder(FrameEncoder<SpillSink>);

    impl Write for SnappyEncoder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }

    impl SectionEncoder for SnappyEncoder {
        fn finish(self: Box<Self>) -> io::Result<SpillSink> {
            self.0
                .into_inner()
                .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))
        }
    }

    impl Codec for SnappyCodec {
        fn name(&self) -> &'static str {
            "snappy"
        }

        fn encoder(&self, sink: SpillSink) -> io::Result<Box<dyn SectionEncoder>> {
            Ok(Box::new(SnappyEncoder(FrameEncoder::new(sink))))
        }

        fn decoder(&self, source: SectionReader) -> io::Result<Box<dyn Read + Send>> {
            Ok(Box::new(FrameDecoder::new(source)))
        }
    }
}
