//! This crate provides an incremental decoder for [EBML][EBML] streams.  Its primary goal is to report elements as early as possible while buffering as little as possible.
//!
//! [EBML][EBML] stands for Extensible Binary Meta-Language and is somewhat of a
//! binary version of XML. It's used for container formats like [WebM][webm] or
//! [MKV][mkv].
//!
//! # Decoding
//! The [`Decoder`] is fed byte chunks of any size (a network stream, a file read piece by piece) and yields [`Event`]s as an iterator.  An [`Event::Element`] is emitted as soon as an element's id and size have been read, carrying its schema definition, its position in the stream and handles to its open ancestors.  Element bodies are only decoded into [`Value`]s when requested with [`Decoder::decode()`] or [`Decoder::decode_as()`], so large binary payloads nobody asked for are skipped without being buffered.
//!
//! Elements of unknown size, as defined in [RFC8794][rfc8794], are supported: they end when an element that can't be their child shows up.
//!
//! [`ReadDecoder`] drives a decoder from a [`std::io::Read`] source, and `AsyncReadDecoder` (behind the `futures` feature) from a `futures::AsyncRead` source.
//!
//! # Schemas
//! Element names and types come from a runtime schema (see the [`schema`] module), which is merged with the EBML header elements by default.  Ids not found in the schema are fatal in strict mode and reported as [`Event::Warning`]s otherwise.
//!
//! [EBML]: http://ebml.sourceforge.net/
//! [webm]: https://www.webmproject.org/
//! [mkv]: http://www.matroska.org/technical/specs/index.html
//! [rfc8794]: https://datatracker.ietf.org/doc/rfc8794/
//!

mod accumulator;
mod decoder;
mod element;
mod errors;
mod limits;
mod options;
mod reader;
mod stack;
pub mod tools;
pub mod types;

#[cfg(feature = "futures")]
pub mod nonblocking;

pub use ebml_decoder_schema as schema;

pub use self::decoder::{DecodedValue, Decoder, Event, RequestId};
pub use self::element::{EBMLSize, Element, Position};
pub use self::limits::{DEFAULT_MAX_ID_LENGTH, DEFAULT_MAX_SIZE_LENGTH};
pub use self::options::DecoderOptions;
pub use self::reader::ReadDecoder;
pub use self::types::{Codec, Value};

#[cfg(feature = "futures")]
pub use self::nonblocking::AsyncReadDecoder;

pub mod error {
    //!
    //! Errors produced by this crate.
    //!
    pub use super::errors::codec::CodecError;
    pub use super::errors::decoder::{DecodeError, WriteError};
    pub use super::errors::tool::ToolError;
    pub use ebml_decoder_schema::SchemaError;
}
