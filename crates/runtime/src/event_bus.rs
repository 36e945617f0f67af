use std::collections::VecDeque;

/// FIFO message queue drained by a single consumer.
///
/// Handlers push messages while processing input and the owner drains them in
/// arrival order on its own thread, so every handler runs to completion before
/// the next message is observed.
#[derive(Debug)]
pub struct MessageQueue<M> {
    messages: VecDeque<M>,
}

impl<M> Default for MessageQueue<M> {
    fn default() -> Self {
        Self {
            messages: VecDeque::new(),
        }
    }
}

impl<M> MessageQueue<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: M) {
        self.messages.push_back(message);
    }

    pub fn pop(&mut self) -> Option<M> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
