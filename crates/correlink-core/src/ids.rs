use correlink_envelope::RequestId;

/// Per-connection request id source.
///
/// A monotonically increasing counter rendered as decimal text. Candidates
/// still pending are skipped, so an id is never handed out twice while live,
/// even after the counter wraps.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new(first: u64) -> Self {
        Self { next: first }
    }

    /// Produce the next id for which `is_live` is false.
    pub fn next_id(&mut self, is_live: impl Fn(&RequestId) -> bool) -> RequestId {
        loop {
            let candidate = RequestId::from(self.next);
            self.next = self.next.wrapping_add(1);
            if !is_live(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
