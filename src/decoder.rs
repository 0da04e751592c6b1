use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace, warn};

use ebml_decoder_schema::{ElementType, Schema, SchemaDefinition, SchemaError};

use super::accumulator::Accumulator;
use super::element::{EBMLSize, Element, Position};
use super::errors::decoder::{DecodeError, WriteError};
use super::limits::{Limit, Limits};
use super::options::DecoderOptions;
use super::stack::{Frame, OpenStack};
use super::tools;
use super::types::{self, Value};

///
/// Identifies a decode request registered with [`Decoder::decode()`] or [`Decoder::decode_as()`].
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RequestId(u64);

///
/// The answer to a decode request.
///
/// `value` is `None` for master and unknown-sized elements; such a request only signals that the element was opened.
///
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedValue {
    pub request: RequestId,
    pub element: Rc<Element>,
    pub value: Option<Value>,
}

///
/// Items produced by the [`Decoder`].
///
#[derive(Debug)]
pub enum Event {
    ///
    /// An element header was read.  Emitted before the element body, so [`Decoder::decode()`] can be called before the next call to `next()`.
    ///
    Element(Rc<Element>),

    ///
    /// The answer to a request made with [`Decoder::decode()`] or [`Decoder::decode_as()`].
    ///
    Value(DecodedValue),

    ///
    /// A recoverable structural problem, only produced when strict mode is disabled.
    ///
    Warning(DecodeError),

    ///
    /// End of input was signalled and all input was processed.
    ///
    Finished,

    ///
    /// The decoder was closed, either by [`Decoder::close()`] or after a fatal error.
    ///
    Closed,
}

#[derive(Clone, Debug)]
enum State {
    IdWidth,
    IdBytes(usize),
    SizeWidth(Arc<SchemaDefinition>),
    SizeBytes(Arc<SchemaDefinition>, usize),
    MasterOpened(Rc<Element>),
    ValueStart(Rc<Element>),
    ValueBytes(Rc<Element>),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Lifecycle {
    Running,
    Finished,
    Closed,
}

#[derive(Debug)]
enum Request {
    User {
        id: RequestId,
        element_type: Option<ElementType>,
    },
    Limit(Limit),
}

#[derive(Debug)]
struct Outbox {
    events: VecDeque<Result<Event, DecodeError>>,
    strict: bool,
}

impl Outbox {
    fn emit(&mut self, event: Event) {
        self.events.push_back(Ok(event));
    }

    fn report(&mut self, error: DecodeError) -> Result<(), DecodeError> {
        if self.strict {
            return Err(error);
        }
        warn!("{}", error);
        self.emit(Event::Warning(error));
        Ok(())
    }
}

///
/// An incremental EBML decoder fed with byte chunks of any size.
///
/// Chunks are handed over with [`write()`][Decoder::write] and processed by iterating the decoder.  Iteration returns `None` once the current chunk has been fully consumed (call `write()` again, or [`end()`][Decoder::end] at the end of input) or when the decoder is done.  A chunk can only be written after the previous one was drained in this way.
///
/// Elements are emitted as soon as their header is complete.  Values are only decoded on request: calling [`decode()`][Decoder::decode] right after receiving an [`Event::Element`] queues a request for that element, which is answered by an [`Event::Value`] once the element body has been read.  Bodies nobody asked for are skipped without being buffered.
///
/// ## Example
///
/// ```
/// use ebml_decoder::{Decoder, DecoderOptions, Event};
/// use ebml_decoder::schema::SchemaEntry;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = vec![SchemaEntry::path(0xa1u64, "Title", "utf-8", r"*(\Title)")];
/// let mut decoder = Decoder::new(DecoderOptions::new().schema(schema))?;
///
/// decoder.write(vec![0xa1, 0x85, b'h', b'e', b'l', b'l', b'o'])?;
/// decoder.end();
///
/// let mut title = None;
/// while let Some(event) = decoder.next() {
///     match event? {
///         Event::Element(element) if element.name() == "Title" => { decoder.decode(); },
///         Event::Value(decoded) => title = decoded.value,
///         _ => {},
///     }
/// }
///
/// assert_eq!(Some("hello"), title.as_ref().and_then(|v| v.as_str()));
/// # Ok(())
/// # }
/// ```
///
#[derive(Debug)]
pub struct Decoder {
    schema: Schema,
    limits: Limits,
    outbox: Outbox,
    accumulator: Accumulator,
    stack: OpenStack,
    state: State,
    lifecycle: Lifecycle,
    ended: bool,

    requests: VecDeque<Request>,
    next_request: u64,

    vint: [u8; 8],
    element_offset: u64,
    header_size: usize,
}

impl Decoder {

    ///
    /// Returns a new `Decoder` for the given options.
    ///
    /// # Errors
    ///
    /// Fails if the schema in `options` can't be compiled.
    ///
    pub fn new(options: DecoderOptions) -> Result<Self, SchemaError> {
        let schema = Schema::compile(&options.schema, options.header)?;

        let mut decoder = Decoder {
            schema,
            limits: Limits::new(options.max_id_length, options.max_size_length),
            outbox: Outbox {
                events: VecDeque::new(),
                strict: options.strict,
            },
            accumulator: Accumulator::new(),
            stack: OpenStack::default(),
            state: State::IdWidth,
            lifecycle: Lifecycle::Running,
            ended: false,
            requests: VecDeque::new(),
            next_request: 0,
            vint: [0; 8],
            element_offset: 0,
            header_size: 0,
        };
        decoder.begin_id();
        Ok(decoder)
    }

    ///
    /// Hands the next chunk of input to the decoder.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::ChunkPending`] if the previous chunk hasn't been drained by iterating the decoder, [`WriteError::Ended`] after [`end()`][Decoder::end] and [`WriteError::Closed`] once the decoder is closed.
    ///
    pub fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), WriteError> {
        match self.lifecycle {
            Lifecycle::Closed => return Err(WriteError::Closed),
            Lifecycle::Finished => return Err(WriteError::Ended),
            Lifecycle::Running => {},
        }
        if self.ended {
            return Err(WriteError::Ended);
        }
        if !self.accumulator.is_drained() {
            return Err(WriteError::ChunkPending);
        }

        self.accumulator.push(chunk.into());
        Ok(())
    }

    ///
    /// Signals the end of input.  The decoder emits [`Event::Finished`] once the remaining input is processed.
    ///
    /// Input that ends inside an element, or inside unknown-sized elements, finishes without error.
    ///
    pub fn end(&mut self) {
        self.ended = true;
    }

    ///
    /// Closes the decoder, discarding buffered input and undelivered events.  Emits [`Event::Closed`] unless the decoder was already closed.
    ///
    pub fn close(&mut self) {
        if self.lifecycle != Lifecycle::Closed {
            self.outbox.events.clear();
            self.destroy(None);
        }
    }

    ///
    /// Requests the value of the most recently emitted element, decoded as its schema type.
    ///
    pub fn decode(&mut self) -> RequestId {
        self.request(None)
    }

    ///
    /// Requests the value of the most recently emitted element, decoded as `element_type` instead of its schema type.
    ///
    pub fn decode_as(&mut self, element_type: ElementType) -> RequestId {
        self.request(Some(element_type))
    }

    ///
    /// Whether the decoder is waiting for the next chunk.
    ///
    pub fn needs_input(&self) -> bool {
        self.lifecycle == Lifecycle::Running && !self.ended && self.accumulator.is_drained()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    pub fn is_finished(&self) -> bool {
        self.lifecycle == Lifecycle::Finished
    }

    ///
    /// Number of currently open elements.
    ///
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    ///
    /// Absolute stream offset of the next byte to be processed.
    ///
    pub fn offset(&self) -> u64 {
        self.accumulator.offset()
    }

    pub fn max_id_length(&self) -> usize {
        self.limits.max_id_length()
    }

    pub fn max_size_length(&self) -> usize {
        self.limits.max_size_length()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn abort(&mut self, error: DecodeError) {
        self.destroy(Some(error));
    }

    fn request(&mut self, element_type: Option<ElementType>) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.requests.push_back(Request::User { id, element_type });
        id
    }

    fn begin_id(&mut self) {
        self.element_offset = self.accumulator.offset();
        self.header_size = 0;
        self.accumulator.expect(1, false);
        self.state = State::IdWidth;
    }

    fn vint_width(&self, first: u8, max: usize) -> Result<usize, DecodeError> {
        match tools::vint_width(first) {
            Some(width) if width <= max => Ok(width),
            _ => Err(DecodeError::WidthOverflow { position: self.accumulator.offset() - 1, max }),
        }
    }

    ///
    /// Runs the state machine one step.  Returns `false` if the step needs more input.
    ///
    fn advance(&mut self) -> Result<bool, DecodeError> {
        match self.state.clone() {
            State::IdWidth => {
                let Some(data) = self.accumulator.take() else { return Ok(false) };
                let width = self.vint_width(data[0], self.limits.max_id_length())?;
                self.vint[0] = data[0];
                if width == 1 {
                    self.on_id(width)?;
                } else {
                    self.accumulator.expect(width - 1, false);
                    self.state = State::IdBytes(width);
                }
            },
            State::IdBytes(width) => {
                let Some(data) = self.accumulator.take() else { return Ok(false) };
                self.vint[1..width].copy_from_slice(&data);
                self.on_id(width)?;
            },
            State::SizeWidth(definition) => {
                let Some(data) = self.accumulator.take() else { return Ok(false) };
                let width = self.vint_width(data[0], self.limits.max_size_length())?;
                self.vint[0] = data[0];
                if width == 1 {
                    self.on_size(definition, width)?;
                } else {
                    self.accumulator.expect(width - 1, false);
                    self.state = State::SizeBytes(definition, width);
                }
            },
            State::SizeBytes(definition, width) => {
                let Some(data) = self.accumulator.take() else { return Ok(false) };
                self.vint[1..width].copy_from_slice(&data);
                self.on_size(definition, width)?;
            },
            State::MasterOpened(element) => self.open_master(element)?,
            State::ValueStart(element) => {
                let size = element.size().known().unwrap_or(0);
                self.accumulator.expect(size, self.requests.is_empty());
                self.state = State::ValueBytes(element);
            },
            State::ValueBytes(element) => {
                let Some(data) = self.accumulator.take() else { return Ok(false) };
                self.dispatch(element, data)?;
            },
        }
        Ok(true)
    }

    fn on_id(&mut self, width: usize) -> Result<(), DecodeError> {
        let raw = self.vint[..width].iter().fold(0u64, |id, byte| (id << 8) | *byte as u64);
        let key = format!("{:x}", raw);
        self.header_size = width;

        let definition = match self.schema.get(&key) {
            Some(definition) => definition.clone(),
            None => {
                self.outbox.report(DecodeError::UnknownElement { id: format!("0x{}", key), position: self.element_offset })?;
                Arc::new(SchemaDefinition::unknown(&key))
            },
        };

        let closed = self.stack.end_unknown(&definition.context);
        if closed > 0 {
            trace!("{} at {} closed {} unknown-sized element(s)", definition.name, self.element_offset, closed);
        }

        self.accumulator.expect(1, false);
        self.state = State::SizeWidth(definition);
        Ok(())
    }

    fn on_size(&mut self, definition: Arc<SchemaDefinition>, width: usize) -> Result<(), DecodeError> {
        let size = match tools::read_vint(&self.vint[..width]) {
            Ok(Some((value, length))) => EBMLSize::new(value, length),
            _ => None,
        };
        let Some(size) = size else {
            return Err(DecodeError::WidthOverflow { position: self.accumulator.offset() - width as u64, max: self.limits.max_size_length() });
        };
        self.header_size += width;

        let position = Position {
            offset: self.element_offset,
            length: match size {
                EBMLSize::Known(size) => EBMLSize::Known(self.header_size + size),
                EBMLSize::Unknown => EBMLSize::Unknown,
            },
        };
        let is_master = definition.element_type.is_master();
        let element = Rc::new(Element::new(definition, size, position, self.stack.elements()));
        trace!("{} ({}) at {} with size {}", element.name(), element.id(), position.offset, size);

        if is_master || !size.is_known() {
            self.stack.push(Frame::new(element.clone(), self.header_size));
            self.state = State::MasterOpened(element.clone());
        } else {
            self.state = State::ValueStart(element.clone());
        }

        if let Some(limit) = self.limits.observe(&element) {
            self.requests.push_back(Request::Limit(limit));
        }
        self.outbox.emit(Event::Element(element));
        Ok(())
    }

    fn open_master(&mut self, element: Rc<Element>) -> Result<(), DecodeError> {
        while let Some(request) = self.requests.pop_front() {
            if let Request::User { id, .. } = request {
                self.outbox.emit(Event::Value(DecodedValue { request: id, element: element.clone(), value: None }));
            }
        }

        if element.size() == EBMLSize::Known(0) {
            self.charge(0)?;
        }
        self.begin_id();
        Ok(())
    }

    fn dispatch(&mut self, element: Rc<Element>, data: Bytes) -> Result<(), DecodeError> {
        while let Some(request) = self.requests.pop_front() {
            match request {
                Request::User { id, element_type } => {
                    let element_type = element_type.unwrap_or_else(|| element.element_type());
                    let value = decode_value(&element, element_type, &data)?;
                    self.outbox.emit(Event::Value(DecodedValue { request: id, element: element.clone(), value }));
                },
                Request::Limit(limit) => {
                    if let Some(value) = decode_value(&element, ElementType::UnsignedInteger, &data)? {
                        self.limits.apply(limit, &value);
                    }
                },
            }
        }

        let consumed = element.position().length.known().unwrap_or(self.header_size);
        self.charge(consumed as u64)?;
        self.begin_id();
        Ok(())
    }

    fn charge(&mut self, consumed: u64) -> Result<(), DecodeError> {
        let outbox = &mut self.outbox;
        self.stack.consume(consumed, |parent, overrun| {
            outbox.report(DecodeError::SizeOverflow {
                parent: parent.id().to_string(),
                position: parent.position().offset,
                excess: overrun.excess,
            })
        })
    }

    fn finish(&mut self) {
        if self.stack.len() > 0 {
            debug!("Input ended with {} open element(s)", self.stack.len());
        }
        debug!("Decoder finished at offset {}", self.accumulator.offset());
        self.lifecycle = Lifecycle::Finished;
        self.outbox.emit(Event::Finished);
    }

    fn destroy(&mut self, error: Option<DecodeError>) {
        if self.lifecycle == Lifecycle::Closed {
            return;
        }
        self.lifecycle = Lifecycle::Closed;
        self.accumulator.clear();
        self.stack.clear();
        self.requests.clear();

        if let Some(error) = error {
            debug!("Decoder failed: {}", error);
            self.outbox.events.push_back(Err(error));
        }
        debug!("Decoder closed");
        self.outbox.emit(Event::Closed);
    }
}

fn decode_value(element: &Element, element_type: ElementType, data: &Bytes) -> Result<Option<Value>, DecodeError> {
    match types::for_type(element_type) {
        None => Ok(None),
        Some(codec) => codec.decode(data)
            .map(Some)
            .map_err(|source| DecodeError::CodecFailure {
                id: element.id().to_string(),
                position: element.position().offset,
                element_type,
                source,
            }),
    }
}

impl Iterator for Decoder {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.outbox.events.pop_front() {
                return Some(event);
            }
            if self.lifecycle != Lifecycle::Running {
                return None;
            }

            match self.advance() {
                Ok(true) => {},
                Ok(false) if self.ended => self.finish(),
                Ok(false) => return None,
                Err(error) => self.destroy(Some(error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ebml_decoder_schema::SchemaEntry;

    use super::*;

    fn string_decoder() -> Decoder {
        Decoder::new(DecoderOptions::new().schema(vec![
            SchemaEntry::path(0xa1u64, "StringElement", "string", r"*(\StringElement)"),
        ])).unwrap()
    }

    #[test]
    fn waits_for_input() {
        let mut decoder = string_decoder();

        assert!(decoder.needs_input());
        assert!(decoder.next().is_none());

        decoder.write(vec![0xa1]).unwrap();
        assert!(!decoder.needs_input());
        assert!(decoder.next().is_none());
        assert!(decoder.needs_input());
    }

    #[test]
    fn refuses_chunks_until_drained() {
        let mut decoder = string_decoder();
        decoder.write(vec![0xa1, 0x80, 0xa1, 0x80]).unwrap();

        assert!(matches!(decoder.next(), Some(Ok(Event::Element(_)))));
        assert_eq!(Err(WriteError::ChunkPending), decoder.write(vec![0xa1]));

        assert!(matches!(decoder.next(), Some(Ok(Event::Element(_)))));
        assert!(decoder.next().is_none());
        assert_eq!(Ok(()), decoder.write(vec![0xa1]));
    }

    #[test]
    fn request_ids_are_unique() {
        let mut decoder = string_decoder();
        let first = decoder.decode();
        let second = decoder.decode_as(ElementType::Binary);

        assert_ne!(first, second);
    }

    #[test]
    fn close_is_idempotent() {
        let mut decoder = string_decoder();
        decoder.write(vec![0xa1, 0x80]).unwrap();
        decoder.close();
        decoder.close();

        assert!(matches!(decoder.next(), Some(Ok(Event::Closed))));
        assert!(decoder.next().is_none());
        assert!(decoder.is_closed());
        assert_eq!(Err(WriteError::Closed), decoder.write(vec![0xa1]));
    }

    #[test]
    fn end_finishes() {
        let mut decoder = string_decoder();
        decoder.end();

        assert!(matches!(decoder.next(), Some(Ok(Event::Finished))));
        assert!(decoder.next().is_none());
        assert!(decoder.is_finished());
        assert_eq!(Err(WriteError::Ended), decoder.write(vec![0xa1]));
    }

    #[test]
    fn tracks_offset() {
        let mut decoder = string_decoder();
        decoder.write(vec![0xa1, 0x82, b'o']).unwrap();
        while decoder.next().is_some() {}

        assert_eq!(3, decoder.offset());
    }
}
