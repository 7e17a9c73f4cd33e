//! Round-robin selection over the live subset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Lock-free rotating cursor.
///
/// Each call advances the shared counter by one and scans forward from the
/// new position, skipping backends that are not alive. A scan never examines
/// more than `backends.len()` candidates.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next live backend, or `None` when every backend is down.
    ///
    /// When the pick is not at the starting slot the cursor is moved onto it,
    /// so the next call resumes just after the last-known-good backend.
    /// Concurrent callers may overwrite each other's hint; the scan corrects
    /// for it.
    pub fn next_live(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1) % len;

        for offset in 0..len {
            let index = (start + offset) % len;
            let backend = &backends[index];
            if backend.is_alive() {
                if index != start {
                    self.cursor.store(index, Ordering::Relaxed);
                }
                return Some(backend.clone());
            }
        }
        None
    }

    #[cfg(test)]
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::tests::backend;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let b1 = backend("http://127.0.0.1:8080");
        let b2 = backend("http://127.0.0.1:8081");
        let backends = vec![b1.clone(), b2.clone()];

        let s1 = lb.next_live(&backends).unwrap();
        let s2 = lb.next_live(&backends).unwrap();
        let s3 = lb.next_live(&backends).unwrap();

        assert_ne!(s1.url(), s2.url());
        assert_eq!(s1.url(), s3.url());
    }

    #[test]
    fn test_skips_dead_and_moves_cursor() {
        let lb = RoundRobin::new();
        let backends = vec![
            backend("http://127.0.0.1:8080"),
            backend("http://127.0.0.1:8081"),
            backend("http://127.0.0.1:8082"),
        ];
        backends[1].set_alive(false);

        // Starts at index 1 (dead), lands on 2.
        let picked = lb.next_live(&backends).unwrap();
        assert_eq!(picked.url(), backends[2].url());
        assert_eq!(lb.position(), 2);

        // Resumes just after the hint.
        let picked = lb.next_live(&backends).unwrap();
        assert_eq!(picked.url(), backends[0].url());
    }

    #[test]
    fn test_empty_slice() {
        let lb = RoundRobin::new();
        assert!(lb.next_live(&[]).is_none());
    }

    #[test]
    fn test_cursor_wraps() {
        let lb = RoundRobin {
            cursor: AtomicUsize::new(usize::MAX),
        };
        let backends = vec![backend("http://127.0.0.1:8080"), backend("http://127.0.0.1:8081")];

        assert!(lb.next_live(&backends).is_some());
        assert!(lb.next_live(&backends).is_some());
    }
}
