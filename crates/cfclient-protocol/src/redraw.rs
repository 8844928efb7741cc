//! Coordination between map updates and a renderer.
//!
//! A renderer must never draw a map that is halfway through a `map2`
//! update. Both sides share a [`RedrawLock`]: the engine holds it for the
//! whole begin/deltas/end bracket, and the renderer takes it while drawing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::map2::MapDelta;

/// One step of a bracketed map update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapUpdate<'a> {
    Begin,
    Delta(&'a MapDelta),
    End,
}

/// A shared handle to the map critical section.
///
/// Cloning is cheap and every clone guards the same section.
#[derive(Debug, Clone, Default)]
pub struct RedrawLock(Arc<Mutex<()>>);

impl RedrawLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the critical section.
    ///
    /// A panic in another holder does not leave the lock unusable: the
    /// guarded data is `()`, so there is no state that could be corrupt.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `deltas` to `emit` as `Begin`, each delta in order, `End`,
    /// all while holding the lock.
    pub fn bracket<F>(&self, deltas: &[MapDelta], mut emit: F)
    where
        F: FnMut(MapUpdate<'_>),
    {
        let _guard = self.lock();
        emit(MapUpdate::Begin);
        for delta in deltas {
            emit(MapUpdate::Delta(delta));
        }
        emit(MapUpdate::End);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_order() {
        let lock = RedrawLock::new();
        let deltas = [MapDelta::Clear { x: 0, y: 0 }, MapDelta::Scroll { dx: 1, dy: 0 }];
        let mut seen = Vec::new();
        lock.bracket(&deltas, |u| seen.push(format!("{u:?}")));
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], "Begin");
        assert!(seen[1].contains("Clear"));
        assert!(seen[2].contains("Scroll"));
        assert_eq!(seen[3], "End");
    }

    #[test]
    fn test_lock_is_held_during_bracket() {
        let lock = RedrawLock::new();
        let observer = lock.clone();
        lock.bracket(&[], |_| {
            assert!(observer.0.try_lock().is_err(), "lock must be held");
        });
        assert!(observer.0.try_lock().is_ok());
    }

    #[test]
    fn test_poisoned_lock_is_still_usable() {
        let lock = RedrawLock::new();
        let poisoner = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("renderer crashed");
        })
        .join();
        let mut count = 0;
        lock.bracket(&[], |_| count += 1);
        assert_eq!(count, 2);
    }
}
