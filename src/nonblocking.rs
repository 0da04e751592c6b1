use std::io::ErrorKind;

use bytes::Bytes;
use futures::{AsyncRead, AsyncReadExt, Stream};

use ebml_decoder_schema::{ElementType, SchemaError};

use crate::decoder::{Decoder, Event, RequestId};
use crate::errors::decoder::DecodeError;
use crate::options::DecoderOptions;

///
/// Drives a [`Decoder`] from any source implementing [`futures::AsyncRead`].
///
/// Reads interrupted with [`ErrorKind::Interrupted`] are retried.
///
/// Events are consumed by calling [`.next().await`][AsyncReadDecoder::next] in a loop.  When values aren't needed the decoder can be turned into a [`Stream`] using [`into_stream`][AsyncReadDecoder::into_stream].
///
pub struct AsyncReadDecoder<R: AsyncRead + Unpin> {
    source: R,
    buffer: Box<[u8]>,
    decoder: Decoder,
}

impl<R: AsyncRead + Unpin> AsyncReadDecoder<R> {

    pub fn new(source: R, options: DecoderOptions) -> Result<Self, SchemaError> {
        Ok(Self {
            source,
            buffer: vec![0u8; 1024 * 64].into_boxed_slice(),
            decoder: Decoder::new(options)?,
        })
    }

    pub async fn next(&mut self) -> Option<Result<Event, DecodeError>> {
        loop {
            if let Some(event) = self.decoder.next() {
                return Some(event);
            }
            if !self.decoder.needs_input() {
                return None;
            }

            match self.source.read(&mut self.buffer).await {
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

    pub fn decode(&mut self) -> RequestId {
        self.decoder.decode()
    }

    pub fn decode_as(&mut self, element_type: ElementType) -> RequestId {
        self.decoder.decode_as(element_type)
    }

    pub fn close(&mut self) {
        self.decoder.close();
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Event, DecodeError>> {
        futures::stream::unfold(self, |mut read| async move {
            let next = read.next().await;
            next.map(move |it| (it, read))
        })
    }
}
