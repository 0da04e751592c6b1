use std::io::{ErrorKind, Read};

use bytes::Bytes;

use ebml_decoder_schema::{ElementType, SchemaError};

use super::decoder::{Decoder, Event, RequestId};
use super::errors::decoder::DecodeError;
use super::options::DecoderOptions;

const DEFAULT_BUFFER_LEN: usize = 1024 * 64;

///
/// Drives a [`Decoder`] from any source implementing [`std::io::Read`].
///
/// Iterating a `ReadDecoder` yields the same events as the wrapped decoder, reading the next chunk from `source` whenever the decoder asks for more input.  Reaching the end of the source ends the input, so iteration stops after [`Event::Finished`].  A failing read closes the decoder with [`DecodeError::Read`].
///
/// ## Example
///
/// ```
/// use std::io::Cursor;
/// use ebml_decoder::{DecoderOptions, Event, ReadDecoder};
///
/// let source = Cursor::new(vec![0x1a, 0x45, 0xdf, 0xa3, 0x80]);
/// let events: Vec<_> = ReadDecoder::new(source, DecoderOptions::new()).unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert!(matches!(&events[0], Event::Element(e) if e.name() == "EBML"));
/// assert!(matches!(events[1], Event::Finished));
/// ```
///
pub struct ReadDecoder<R: Read> {
    source: R,
    buffer: Box<[u8]>,
    decoder: Decoder,
}

impl<R: Read> ReadDecoder<R> {

    ///
    /// Returns a new `ReadDecoder` reading from `source` in chunks of 64 KiB.
    ///
    pub fn new(source: R, options: DecoderOptions) -> Result<Self, SchemaError> {
        Self::with_capacity(DEFAULT_BUFFER_LEN, source, options)
    }

    ///
    /// Returns a new `ReadDecoder` reading from `source` in chunks of at most `capacity` bytes.
    ///
    pub fn with_capacity(capacity: usize, source: R, options: DecoderOptions) -> Result<Self, SchemaError> {
        Ok(ReadDecoder {
            source,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            decoder: Decoder::new(options)?,
        })
    }

    ///
    /// See [`Decoder::decode()`].
    ///
    pub fn decode(&mut self) -> RequestId {
        self.decoder.decode()
    }

    ///
    /// See [`Decoder::decode_as()`].
    ///
    pub fn decode_as(&mut self, element_type: ElementType) -> RequestId {
        self.decoder.decode_as(element_type)
    }

    pub fn close(&mut self) {
        self.decoder.close();
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> Iterator for ReadDecoder<R> {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.decoder.next() {
                return Some(event);
            }
            if !self.decoder.needs_input() {
                return None;
            }

            match self.source.read(&mut self.buffer) {
                Ok(0) => self.decoder.end(),
                Ok(len) => {
                    let written = self.decoder.write(Bytes::copy_from_slice(&self.buffer[..len]));
                    debug_assert!(written.is_ok());
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(source) => self.decoder.abort(DecodeError::Read { source }),
            }
        }
    }
}
