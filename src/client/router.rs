//! Inbound message routing.
//!
//! Associates topic filters with callbacks. Dispatch is first-match-wins over
//! the bindings in subscription order, with an optional default callback for
//! deliveries no filter matches.

use super::Message;
use crate::error::Error;
use crate::packet::topic_matches;
use heapless::String;

/// Maximum stored length of a subscription topic filter, in bytes.
pub const MAX_FILTER_LEN: usize = 128;

/// Callback invoked synchronously for each matching inbound publish.
///
/// Runs on the task driving the receive cycle and must not block
/// indefinitely.
pub type MessageCallback = fn(&Message<'_>);

#[derive(Debug)]
struct Binding {
    filter: String<MAX_FILTER_LEN>,
    callback: MessageCallback,
}

/// An ordered topic-filter to callback table.
#[derive(Debug)]
pub struct MessageRouter<const N: usize> {
    bindings: heapless::Vec<Binding, N>,
    default_callback: Option<MessageCallback>,
}

impl<const N: usize> MessageRouter<N> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            bindings: heapless::Vec::new(),
            default_callback: None,
        }
    }

    /// Bind `callback` to `filter`, replacing an existing binding for the
    /// same filter.
    pub fn bind(&mut self, filter: &str, callback: MessageCallback) -> Result<(), Error> {
        if let Some(binding) = self.bindings.iter_mut().find(|b| b.filter.as_str() == filter) {
            binding.callback = callback;
            return Ok(());
        }
        let filter =
            String::try_from(filter).map_err(|_| Error::TooManySubscriptions)?;
        self.bindings
            .push(Binding { filter, callback })
            .map_err(|_| Error::TooManySubscriptions)
    }

    /// Remove the binding for `filter`. Returns whether one existed.
    pub fn unbind(&mut self, filter: &str) -> bool {
        match self.bindings.iter().position(|b| b.filter.as_str() == filter) {
            Some(index) => {
                self.bindings.remove(index);
                true
            }
            None => false,
        }
    }

    /// Install the fallback callback for deliveries no filter matches.
    pub fn set_default(&mut self, callback: MessageCallback) {
        self.default_callback = Some(callback);
    }

    /// Deliver `message` to the first binding whose filter matches its topic,
    /// falling back to the default callback. Returns whether any callback ran.
    pub fn dispatch(&self, message: &Message<'_>) -> bool {
        for binding in &self.bindings {
            if topic_matches(&binding.filter, message.topic) {
                (binding.callback)(message);
                return true;
            }
        }
        if let Some(callback) = self.default_callback {
            callback(message);
            return true;
        }
        false
    }
}

impl<const N: usize> Default for MessageRouter<N> {
    fn default() -> Self {
        Self::new()
    }
}
