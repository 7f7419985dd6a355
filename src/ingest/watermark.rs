// src/ingest/watermark.rs

/// Per-source "last seen" cursor. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark<K> {
    current: K,
}

impl<K: Copy + Ord> Watermark<K> {
    pub fn new(initial: K) -> Self {
        Self { current: initial }
    }

    pub fn get(&self) -> K {
        self.current
    }

    /// True if `key` was already covered by this watermark.
    pub fn has_seen(&self, key: K) -> bool {
        key <= self.current
    }

    /// Move to `key` if it is newer. Returns whether the watermark moved.
    pub fn advance(&mut self, key: K) -> bool {
        if key > self.current {
            self.current = key;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_only_moves_forward() {
        let mut wm = Watermark::new(5u64);
        assert!(!wm.advance(3));
        assert!(!wm.advance(5));
        assert_eq!(wm.get(), 5);
        assert!(wm.advance(9));
        assert_eq!(wm.get(), 9);
    }

    #[test]
    fn has_seen_is_inclusive() {
        let wm = Watermark::new(10u64);
        assert!(wm.has_seen(10));
        assert!(wm.has_seen(1));
        assert!(!wm.has_seen(11));
    }
}
