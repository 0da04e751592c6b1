use log::{debug, warn};

use ebml_decoder_schema::header::{MAX_ID_LENGTH_ID, MAX_SIZE_LENGTH_ID};

use super::element::Element;
use super::types::Value;

pub const DEFAULT_MAX_ID_LENGTH: usize = 4;
pub const DEFAULT_MAX_SIZE_LENGTH: usize = 8;

///
/// A vint width limit that the stream itself can declare.
///
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Limit {
    IdLength,
    SizeLength,
}

///
/// Vint width limits, adjusted from `EBMLMaxIDLength` and `EBMLMaxSizeLength` elements unless they were configured explicitly.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Limits {
    max_id_length: usize,
    max_size_length: usize,
    id_fixed: bool,
    size_fixed: bool,
}

impl Limits {
    pub fn new(max_id_length: Option<usize>, max_size_length: Option<usize>) -> Self {
        Limits {
            max_id_length: max_id_length.unwrap_or(DEFAULT_MAX_ID_LENGTH),
            max_size_length: max_size_length.unwrap_or(DEFAULT_MAX_SIZE_LENGTH),
            id_fixed: max_id_length.is_some(),
            size_fixed: max_size_length.is_some(),
        }
    }

    pub fn max_id_length(&self) -> usize {
        self.max_id_length
    }

    pub fn max_size_length(&self) -> usize {
        self.max_size_length
    }

    ///
    /// Returns the limit `element` declares, if its value should be applied.
    ///
    pub fn observe(&self, element: &Element) -> Option<Limit> {
        let key = &element.definition().key;
        if !self.id_fixed && key == MAX_ID_LENGTH_ID {
            Some(Limit::IdLength)
        } else if !self.size_fixed && key == MAX_SIZE_LENGTH_ID {
            Some(Limit::SizeLength)
        } else {
            None
        }
    }

    pub fn apply(&mut self, limit: Limit, value: &Value) {
        let width = match value.as_unsigned_int() {
            Some(width @ 1..=8) => width as usize,
            _ => {
                warn!("Ignoring out of range {:?} value {:?}", limit, value);
                return;
            }
        };

        debug!("Stream declared {:?} of {} bytes", limit, width);
        match limit {
            Limit::IdLength => self.max_id_length = width,
            Limit::SizeLength => self.max_size_length = width,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ebml_decoder_schema::Schema;

    use super::*;
    use crate::element::{EBMLSize, Position};

    fn header_element(key: &str) -> Element {
        let schema = Schema::compile(&[], true).unwrap();
        let definition = schema.get(key).expect("header definition").clone();
        let ancestors = vec![Rc::new(Element::new(
            schema.get("1a45dfa3").unwrap().clone(),
            EBMLSize::Known(4),
            Position { offset: 0, length: EBMLSize::Known(9) },
            Vec::new(),
        ))];
        Element::new(definition, EBMLSize::Known(1), Position { offset: 5, length: EBMLSize::Known(4) }, ancestors)
    }

    #[test]
    fn defaults() {
        let limits = Limits::new(None, None);
        assert_eq!(4, limits.max_id_length());
        assert_eq!(8, limits.max_size_length());
    }

    #[test]
    fn adopts_declared_limits() {
        let mut limits = Limits::new(None, None);

        let id_length = header_element(MAX_ID_LENGTH_ID);
        assert_eq!(Some(Limit::IdLength), limits.observe(&id_length));
        limits.apply(Limit::IdLength, &Value::UnsignedInteger(3));

        let size_length = header_element(MAX_SIZE_LENGTH_ID);
        assert_eq!(Some(Limit::SizeLength), limits.observe(&size_length));
        limits.apply(Limit::SizeLength, &Value::UnsignedInteger(5));

        assert_eq!(3, limits.max_id_length());
        assert_eq!(5, limits.max_size_length());
    }

    #[test]
    fn explicit_limits_are_kept() {
        let limits = Limits::new(Some(2), Some(4));

        assert_eq!(None, limits.observe(&header_element(MAX_ID_LENGTH_ID)));
        assert_eq!(None, limits.observe(&header_element(MAX_SIZE_LENGTH_ID)));
    }

    #[test]
    fn ignores_other_elements() {
        let limits = Limits::new(None, None);
        assert_eq!(None, limits.observe(&header_element("4282")));
    }

    #[test]
    fn ignores_unusable_widths() {
        let mut limits = Limits::new(None, None);
        limits.apply(Limit::IdLength, &Value::UnsignedInteger(0));
        limits.apply(Limit::SizeLength, &Value::UnsignedInteger(9));
        limits.apply(Limit::SizeLength, &Value::String(String::from("8")));

        assert_eq!(Limits::new(None, None), limits);
    }
}
