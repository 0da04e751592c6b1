//!
//! Contains the types describing elements emitted by the [`Decoder`][`super::Decoder`].
//!

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use ebml_decoder_schema::{ElementType, SchemaDefinition};

use super::tools;

///
/// A declared element size or encoded length.
///
/// `Unknown` is the reserved "unknown data size" value; such elements are closed by structure rather than by byte counting and keep the `Unknown` size for their whole lifetime.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EBMLSize {
    Known(usize),
    Unknown
}

impl EBMLSize {
    ///
    /// Interprets a decoded size vint.  Returns `None` for a definite size that doesn't fit in `usize`.
    ///
    pub fn new(size: u64, vint_length: usize) -> Option<Self> {
        if tools::is_unknown_size(size, vint_length) {
            return Some(EBMLSize::Unknown);
        }
        usize::try_from(size).ok().map(EBMLSize::Known)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, EBMLSize::Known(_))
    }

    pub fn known(&self) -> Option<usize> {
        match self {
            EBMLSize::Known(size) => Some(*size),
            EBMLSize::Unknown => None,
        }
    }
}

impl fmt::Display for EBMLSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EBMLSize::Known(size) => write!(f, "{}", size),
            EBMLSize::Unknown => f.write_str("unknown"),
        }
    }
}

///
/// Where an element sits in the byte stream.
///
/// `offset` is the absolute position of the first id byte.  `length` covers the header and the body.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    pub offset: u64,
    pub length: EBMLSize,
}

///
/// An element observed by the [`Decoder`][`super::Decoder`].
///
/// Elements are shared as `Rc<Element>`: the handles in [`Element::ancestors()`] are the same allocations that were emitted when those ancestors were observed, so `Rc::ptr_eq` can be used to test whether an element descends from another.
///
#[derive(Clone, PartialEq)]
pub struct Element {
    definition: Arc<SchemaDefinition>,
    size: EBMLSize,
    position: Position,
    ancestors: Vec<Rc<Element>>,
}

impl Element {
    pub(crate) fn new(definition: Arc<SchemaDefinition>, size: EBMLSize, position: Position, ancestors: Vec<Rc<Element>>) -> Self {
        Element { definition, size, position, ancestors }
    }

    ///
    /// The element id as `0x` followed by lowercase hex, including the vint marker bits (e.g. `"0x1a45dfa3"`).
    ///
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn element_type(&self) -> ElementType {
        self.definition.element_type
    }

    pub fn size(&self) -> EBMLSize {
        self.size
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }

    ///
    /// Open ancestors at the time this element was observed, outermost first.
    ///
    pub fn ancestors(&self) -> &[Rc<Element>] {
        &self.ancestors
    }

    ///
    /// The ancestors followed by the element itself.
    ///
    pub fn path(&self) -> impl Iterator<Item = &Element> {
        self.ancestors.iter().map(|e| e.as_ref()).chain(std::iter::once(self))
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_master(&self) -> bool {
        self.element_type().is_master()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("type", &self.element_type())
            .field("size", &self.size)
            .field("position", &self.position)
            .field("path", &self.path().map(|e| e.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sizes() {
        assert_eq!(Some(EBMLSize::Unknown), EBMLSize::new(0x7F, 1));
        assert_eq!(Some(EBMLSize::Unknown), EBMLSize::new((1 << 56) - 1, 8));
        assert_eq!(Some(EBMLSize::Known(0x7F)), EBMLSize::new(0x7F, 2));
        assert_eq!(Some(EBMLSize::Known(0)), EBMLSize::new(0, 1));
        assert_eq!(None, EBMLSize::Unknown.known());
        assert_eq!("unknown", EBMLSize::Unknown.to_string());
    }

    #[test]
    #[cfg(target_pointer_width = "32")]
    fn oversized_definite_size() {
        assert_eq!(None, EBMLSize::new(1 << 40, 8));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn large_definite_size() {
        assert_eq!(Some(EBMLSize::Known(1 << 40)), EBMLSize::new(1 << 40, 8));
    }

    #[test]
    fn path_ends_with_self() {
        let master = Rc::new(Element::new(
            Arc::new(SchemaDefinition::unknown("a2")),
            EBMLSize::Unknown,
            Position { offset: 0, length: EBMLSize::Unknown },
            Vec::new(),
        ));
        let child = Element::new(
            Arc::new(SchemaDefinition::unknown("a1")),
            EBMLSize::Known(5),
            Position { offset: 2, length: EBMLSize::Known(7) },
            vec![master.clone()],
        );

        let ids: Vec<&str> = child.path().map(|e| e.id()).collect();
        assert_eq!(vec!["0xa2", "0xa1"], ids);
        assert!(Rc::ptr_eq(&master, &child.ancestors()[0]));
        assert_eq!(1, child.depth());
    }
}
