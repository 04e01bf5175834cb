use tracing::debug;

use crate::controls::SequenceEvent;

/// Active attribute index over a series of `len` attributes.
///
/// Every transition calls `notify` with the new index before returning, so
/// listeners always see the state the controller ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceController {
    index: usize,
    len: usize,
}

impl SequenceController {
    /// Starts at index 0. `len` must be at least 1.
    pub fn new(len: usize) -> Self {
        debug_assert!(len > 0, "sequence needs at least one attribute");
        Self {
            index: 0,
            len: len.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn forward(&mut self, notify: impl FnOnce(usize)) -> usize {
        self.transition((self.index + 1) % self.len, notify)
    }

    pub fn reverse(&mut self, notify: impl FnOnce(usize)) -> usize {
        self.transition((self.index + self.len - 1) % self.len, notify)
    }

    /// Jumps straight to `index`. The slider bounds keep it in range.
    pub fn set_index(&mut self, index: usize, notify: impl FnOnce(usize)) -> usize {
        self.transition(index, notify)
    }

    pub fn apply(&mut self, event: SequenceEvent, notify: impl FnOnce(usize)) -> usize {
        match event {
            SequenceEvent::Forward => self.forward(notify),
            SequenceEvent::Reverse => self.reverse(notify),
            SequenceEvent::Slide(index) => self.set_index(index, notify),
        }
    }

    fn transition(&mut self, index: usize, notify: impl FnOnce(usize)) -> usize {
        debug!(from = self.index, to = index, "Sequence transition");
        self.index = index;
        notify(index);
        index
    }
}
