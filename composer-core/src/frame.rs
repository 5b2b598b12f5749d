//! Redraw coalescing.
//!
//! Mutations call [`FrameScheduler::request`]; the host calls
//! [`FrameScheduler::take`] once per display refresh and paints only when it
//! returns `true`. Any number of requests between two frames produce a
//! single paint.

/// Tracks whether a redraw is pending for the next frame.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: bool,
    frames_painted: u64,
    requests_coalesced: u64,
}

impl FrameScheduler {
    /// Create a scheduler with a redraw pending, so the first frame paints.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }

    /// Ask for a redraw. Returns `true` if this request scheduled a new
    /// frame, `false` if one was already pending.
    pub fn request(&mut self) -> bool {
        if self.pending {
            self.requests_coalesced += 1;
            false
        } else {
            self.pending = true;
            true
        }
    }

    /// Consume the pending redraw, if any.
    pub fn take(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            self.frames_painted += 1;
            true
        } else {
            false
        }
    }

    /// Whether a redraw is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Frames handed out by [`take`](Self::take) so far.
    #[must_use]
    pub fn frames_painted(&self) -> u64 {
        self.frames_painted
    }

    /// Requests absorbed into an already pending frame.
    #[must_use]
    pub fn requests_coalesced(&self) -> u64 {
        self.requests_coalesced
    }
}
