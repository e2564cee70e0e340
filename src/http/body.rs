//! Message bodies.
//!
//! A [`Body`] is either fully buffered or backed by a reader. Reader-backed
//! bodies are consumed at most once; the bytes are cached and every clone of
//! the body observes the same cached content.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::HttpError;

type BoxedReader = Box<dyn Read + Send>;

struct LazyStream {
    origin: String,
    reader: Mutex<Option<BoxedReader>>,
    cached: OnceCell<Bytes>,
}

impl LazyStream {
    fn read(&self, limit: usize) -> Result<Bytes, HttpError> {
        self.cached
            .get_or_try_init(|| {
                let reader = self
                    .reader
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                let Some(reader) = reader else {
                    return Ok(Bytes::new());
                };
                let mut buf = Vec::new();
                // One extra byte tells "exactly at the limit" from "over it".
                let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
                reader.take(cap).read_to_end(&mut buf)?;
                if buf.len() > limit {
                    return Err(HttpError::BodyTooLarge { limit });
                }
                debug!(origin = %self.origin, size_bytes = buf.len(), "Body stream read");
                Ok(Bytes::from(buf))
            })
            .cloned()
    }
}

#[derive(Clone)]
enum Source {
    Full(Bytes),
    Stream(Arc<LazyStream>),
}

/// Byte content of a request or response.
#[derive(Clone)]
pub struct Body {
    source: Source,
    limit: usize,
}

impl Body {
    #[must_use]
    pub fn empty() -> Self {
        Self::full(Bytes::new())
    }

    #[must_use]
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Self {
            source: Source::Full(bytes.into()),
            limit: usize::MAX,
        }
    }

    /// Body read lazily from `reader` the first time its bytes are needed.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::stream("reader".to_string(), Box::new(reader))
    }

    /// Body backed by the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidStreamResource`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HttpError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| HttpError::InvalidStreamResource {
            resource: path.display().to_string(),
            source,
        })?;
        Ok(Self::stream(path.display().to_string(), Box::new(file)))
    }

    fn stream(origin: String, reader: BoxedReader) -> Self {
        Self {
            source: Source::Stream(Arc::new(LazyStream {
                origin,
                reader: Mutex::new(Some(reader)),
                cached: OnceCell::new(),
            })),
            limit: usize::MAX,
        }
    }

    /// Cap the number of bytes this body may yield.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The full content, reading the underlying stream on first use.
    ///
    /// # Errors
    ///
    /// Fails when the stream cannot be read or exceeds the configured limit.
    pub fn bytes(&self) -> Result<Bytes, HttpError> {
        match &self.source {
            Source::Full(bytes) if bytes.len() > self.limit => {
                Err(HttpError::BodyTooLarge { limit: self.limit })
            }
            Source::Full(bytes) => Ok(bytes.clone()),
            Source::Stream(stream) => stream.read(self.limit),
        }
    }

    /// Whether content was supplied. A reader-backed body always counts as populated.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        match &self.source {
            Source::Full(bytes) => !bytes.is_empty(),
            Source::Stream(_) => true,
        }
    }

    /// Size in bytes when known without reading.
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        match &self.source {
            Source::Full(bytes) => Some(bytes.len()),
            Source::Stream(stream) => stream.cached.get().map(Bytes::len),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Source::Stream(stream) => f.debug_tuple("Body::Stream").field(&stream.origin).finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::full(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::full(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::full(text)
    }
}
