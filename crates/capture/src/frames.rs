//! Load-wait contract for nested documents.

use dom::{Dom, NodeRef, ReadyState};
use std::time::Instant;

const BLANK: &str = "about:blank";

/// Whether the content document of `iframe` can be serialized now: fully
/// loaded, and not the blank placeholder a frame shows before navigating to
/// its real `src`.
pub fn frame_ready(dom: &Dom, iframe: NodeRef) -> bool {
    let Some(doc) = dom.frame_document(iframe) else {
        return false;
    };
    if dom.ready_state(doc) != Some(ReadyState::Complete) {
        return false;
    }
    let src = dom.attribute(iframe, "src").unwrap_or_default();
    dom.document_url(doc) != Some(BLANK) || src == BLANK || src.is_empty()
}

#[derive(Clone, Copy, Debug)]
struct PendingFrame {
    iframe: NodeRef,
    deadline: Instant,
}

/// One-shot waits for frames whose content was not ready at capture time.
///
/// A wait fires exactly once: on the host's load notification or, failing
/// that, once its deadline has passed.
#[derive(Debug, Default)]
pub struct FrameWaiter {
    pending: Vec<PendingFrame>,
}

impl FrameWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `iframe`. An existing wait keeps its deadline.
    pub fn wait(&mut self, iframe: NodeRef, deadline: Instant) {
        if self.is_waiting(iframe) {
            return;
        }
        log::debug!(target: "capture.frames", "waiting for frame {iframe:?}");
        self.pending.push(PendingFrame { iframe, deadline });
    }

    pub fn is_waiting(&self, iframe: NodeRef) -> bool {
        self.pending.iter().any(|p| p.iframe == iframe)
    }

    /// Consume the wait for `iframe`, returning whether there was one.
    pub fn take(&mut self, iframe: NodeRef) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.iframe != iframe);
        self.pending.len() != before
    }

    /// Consume every wait whose deadline is at or before `now`, in
    /// registration order.
    pub fn take_expired(&mut self, now: Instant) -> Vec<NodeRef> {
        let mut expired = Vec::new();
        self.pending.retain(|p| {
            if p.deadline <= now {
                expired.push(p.iframe);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
