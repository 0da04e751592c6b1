use std::rc::Rc;

use ebml_decoder_schema::PathContext;

use super::element::Element;

///
/// An element whose body is still being read.
///
/// `remaining` is `None` for unknown-sized elements, which are only closed by [`OpenStack::end_unknown()`].
///
#[derive(Debug)]
pub(crate) struct Frame {
    pub element: Rc<Element>,
    pub remaining: Option<i64>,
    pub total_size: u64,
}

impl Frame {
    pub fn new(element: Rc<Element>, header_size: usize) -> Self {
        let size = element.size().known();
        Frame {
            remaining: size.map(|size| size as i64),
            total_size: (header_size + size.unwrap_or(0)) as u64,
            element,
        }
    }

    fn level(&self) -> i64 {
        self.element.definition().context.level
    }
}

///
/// Sizes reported when a child overran one of its definite-size ancestors.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Overrun {
    pub excess: u64,
}

#[derive(Debug, Default)]
pub(crate) struct OpenStack {
    frames: Vec<Frame>,
}

impl OpenStack {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    ///
    /// Handles to every open element, outermost first.
    ///
    pub fn elements(&self) -> Vec<Rc<Element>> {
        self.frames.iter().map(|frame| frame.element.clone()).collect()
    }

    ///
    /// Closes the unknown-sized elements that an upcoming element with `context` can't be a child of.
    ///
    /// An unknown-sized element ends when an element at the same or a shallower level appears.  Global elements (variable paths) never end one.  Closing stops at the first definite-size frame.
    ///
    pub fn end_unknown(&mut self, context: &PathContext) -> usize {
        let mut closed = 0;
        while let Some(frame) = self.frames.last() {
            if frame.remaining.is_some() || context.level > frame.level() || context.variable {
                break;
            }
            self.frames.pop();
            closed += 1;
        }
        closed
    }

    ///
    /// Charges `consumed` bytes to the innermost definite-size frames, closing every frame whose budget runs out.
    ///
    /// A closed frame charges its own total size to its parent in turn.  `on_overrun` is called with the overrun frame's element whenever a budget goes negative; returning an error stops the propagation.  Unknown-sized frames are never charged.
    ///
    pub fn consume<E>(&mut self, consumed: u64, mut on_overrun: impl FnMut(&Element, Overrun) -> Result<(), E>) -> Result<(), E> {
        let mut consumed = consumed;
        while let Some(frame) = self.frames.last_mut() {
            let remaining = match frame.remaining {
                Some(remaining) => remaining - consumed as i64,
                None => return Ok(()),
            };
            frame.remaining = Some(remaining);

            if remaining < 0 {
                on_overrun(&frame.element, Overrun { excess: remaining.unsigned_abs() })?;
            }
            if remaining > 0 {
                return Ok(());
            }

            consumed = frame.total_size;
            self.frames.pop();
        }
        Ok(())
    }
}
