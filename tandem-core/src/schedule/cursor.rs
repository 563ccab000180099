/// Round-robin position over a fixed number of targets.
///
/// Starting anywhere, `len` consecutive advances visit every index
/// exactly once and land back on the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleCursor {
    position: usize,
    len: usize,
}

impl ScheduleCursor {
    pub fn new(len: usize) -> Self {
        Self { position: 0, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the next target, or `None` with no targets.
    pub fn current(&self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            Some(self.position % self.len)
        }
    }

    pub fn advance(&mut self) {
        if self.len > 0 {
            self.position = (self.position + 1) % self.len;
        }
    }
}
