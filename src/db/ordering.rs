//! Position maintenance for ordered scopes.
//!
//! Cards are ranked within their column and columns within their board by an
//! integer `position`. Every mutation must leave each touched scope holding
//! exactly the positions `{0..n-1}`: no gaps, no duplicates. The pure helpers
//! here compute the shifts a mutation needs; the repos apply them inside a
//! single transaction.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::StoreError;

/// Position for an item appended to a scope that currently holds `count` items.
pub fn append_position(count: u64) -> i32 {
    count as i32
}

/// Clamp a requested target index for a move inside a scope of `count` items.
/// Out-of-range requests are clamped rather than rejected.
pub fn clamp_move_target(count: u64, requested: i32) -> i32 {
    let last = (count as i32 - 1).max(0);
    requested.clamp(0, last)
}

/// Clamp a requested insertion index into a scope of `count` items. Inserting
/// at `count` appends.
pub fn clamp_insert_target(count: u64, requested: i32) -> i32 {
    requested.clamp(0, count as i32)
}

/// A contiguous block of positions to shift by `delta`. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub lo: i32,
    pub hi: i32,
    pub delta: i32,
}

/// Shift required to move an item from `current` to `target` within one
/// scope. The moved item itself is excluded from the range; it takes `target`
/// directly. `None` when the move is a no-op.
pub fn move_shift(current: i32, target: i32) -> Option<Shift> {
    if target > current {
        Some(Shift {
            lo: current + 1,
            hi: target,
            delta: -1,
        })
    } else if target < current {
        Some(Shift {
            lo: target,
            hi: current - 1,
            delta: 1,
        })
    } else {
        None
    }
}

/// Check that a proposed full ordering names the scope's current membership
/// exactly: same ids, no omissions, no duplicates, no foreign ids.
pub fn validate_reorder(current: &[Uuid], proposed: &[Uuid]) -> Result<(), StoreError> {
    if proposed.len() != current.len() {
        return Err(StoreError::InvalidReorderSet);
    }
    let seen: HashSet<&Uuid> = proposed.iter().collect();
    if seen.len() != proposed.len() {
        return Err(StoreError::InvalidReorderSet);
    }
    if current.iter().any(|id| !seen.contains(id)) {
        return Err(StoreError::InvalidReorderSet);
    }
    Ok(())
}

/// Per-scope serialization for mutating operations.
///
/// Concurrent mutations against the same scope queue behind one async mutex;
/// mutations against different scopes run in parallel. Multi-scope operations
/// acquire their locks in ascending Uuid order so two cross-scope moves over
/// the same pair of columns can never deadlock.
#[derive(Clone, Default)]
pub struct ScopeLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, scope: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("scope lock registry poisoned");
        // Entries nobody holds or waits on (strong count 1: the map's own
        // Arc) are dead weight from deleted scopes; drop them here so the
        // registry stays bounded by the number of live guards.
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(map.entry(scope).or_default())
    }

    pub async fn lock(&self, scope: Uuid) -> OwnedMutexGuard<()> {
        self.handle(scope).lock_owned().await
    }

    /// Lock every scope in `scopes`, deduplicated, in ascending Uuid order.
    pub async fn lock_all(&self, scopes: &[Uuid]) -> Vec<OwnedMutexGuard<()>> {
        let unique = normalized(scopes.to_vec());
        let mut guards = Vec::with_capacity(unique.len());
        for scope in unique {
            guards.push(self.lock(scope).await);
        }
        guards
    }

    /// Lock a scope set that has to be discovered by reading, e.g. "the
    /// column this card currently sits in". A scope resolved before its lock
    /// is held can be stale by the time the lock is acquired, so `resolve` is
    /// run again under the locks and the acquisition retried until both
    /// resolutions agree. Once they do the set is pinned: any mutation that
    /// could change it needs one of the locks this call now holds.
    pub async fn lock_resolved<F, Fut, E>(
        &self,
        resolve: F,
    ) -> Result<Vec<OwnedMutexGuard<()>>, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<Uuid>, E>>,
    {
        let mut scopes = normalized(resolve().await?);
        loop {
            let guards = self.lock_all(&scopes).await;
            let confirmed = normalized(resolve().await?);
            if confirmed == scopes {
                return Ok(guards);
            }
            drop(guards);
            scopes = confirmed;
        }
    }
}

fn normalized(mut scopes: Vec<Uuid>) -> Vec<Uuid> {
    scopes.sort();
    scopes.dedup();
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory stand-in for one scope's position column.
    struct Scope {
        items: Vec<(Uuid, i32)>,
    }

    impl Scope {
        fn new(n: usize) -> Self {
            Self {
                items: (0..n).map(|i| (Uuid::new_v4(), i as i32)).collect(),
            }
        }

        fn append(&mut self) -> Uuid {
            let id = Uuid::new_v4();
            let position = append_position(self.items.len() as u64);
            self.items.push((id, position));
            id
        }

        fn remove(&mut self, id: Uuid) {
            let idx = self.items.iter().position(|(i, _)| *i == id).unwrap();
            let removed = self.items.remove(idx).1;
            for (_, p) in &mut self.items {
                if *p > removed {
                    *p -= 1;
                }
            }
        }

        fn move_to(&mut self, id: Uuid, requested: i32) {
            let target = clamp_move_target(self.items.len() as u64, requested);
            let current = self.items.iter().find(|(i, _)| *i == id).unwrap().1;
            let Some(shift) = move_shift(current, target) else {
                return;
            };
            for (other, p) in &mut self.items {
                if *other != id && *p >= shift.lo && *p <= shift.hi {
                    *p += shift.delta;
                }
            }
            let slot = self.items.iter_mut().find(|(i, _)| *i == id).unwrap();
            slot.1 = target;
        }

        fn positions(&self) -> Vec<i32> {
            let mut positions: Vec<i32> = self.items.iter().map(|(_, p)| *p).collect();
            positions.sort();
            positions
        }

        fn ordered_ids(&self) -> Vec<Uuid> {
            let mut items = self.items.clone();
            items.sort_by_key(|(_, p)| *p);
            items.into_iter().map(|(id, _)| id).collect()
        }

        fn assert_dense(&self) {
            let expected: Vec<i32> = (0..self.items.len() as i32).collect();
            assert_eq!(self.positions(), expected, "positions must be 0..n-1");
        }
    }

    #[test]
    fn append_fills_the_next_slot() {
        assert_eq!(append_position(0), 0);
        assert_eq!(append_position(5), 5);
    }

    #[test]
    fn move_target_clamps_to_bounds() {
        assert_eq!(clamp_move_target(3, -4), 0);
        assert_eq!(clamp_move_target(3, 1), 1);
        assert_eq!(clamp_move_target(3, 99), 2);
        assert_eq!(clamp_move_target(0, 7), 0);
    }

    #[test]
    fn insert_target_allows_the_tail_slot() {
        assert_eq!(clamp_insert_target(3, 3), 3);
        assert_eq!(clamp_insert_target(3, 9), 3);
        assert_eq!(clamp_insert_target(0, -1), 0);
    }

    #[test]
    fn forward_move_shifts_the_gap_down() {
        assert_eq!(
            move_shift(1, 3),
            Some(Shift {
                lo: 2,
                hi: 3,
                delta: -1
            })
        );
    }

    #[test]
    fn backward_move_shifts_the_gap_up() {
        assert_eq!(
            move_shift(4, 1),
            Some(Shift {
                lo: 1,
                hi: 3,
                delta: 1
            })
        );
    }

    #[test]
    fn same_slot_move_is_a_noop() {
        assert_eq!(move_shift(2, 2), None);
    }

    #[test]
    fn sequences_of_mutations_keep_density() {
        let mut scope = Scope::new(3);
        let ids = scope.ordered_ids();

        scope.remove(ids[1]);
        scope.assert_dense();

        let d = scope.append();
        scope.assert_dense();
        // remove(B) then append(D): A(0), C(1), D(2)
        assert_eq!(scope.ordered_ids(), vec![ids[0], ids[2], d]);

        scope.move_to(d, 0);
        scope.assert_dense();
        assert_eq!(scope.ordered_ids(), vec![d, ids[0], ids[2]]);

        scope.move_to(ids[0], 99);
        scope.assert_dense();
        assert_eq!(scope.ordered_ids(), vec![d, ids[2], ids[0]]);
    }

    #[test]
    fn repeating_a_move_does_not_change_the_order() {
        let mut scope = Scope::new(4);
        let ids = scope.ordered_ids();

        scope.move_to(ids[3], 1);
        let after_first = scope.ordered_ids();
        scope.move_to(ids[3], 1);
        assert_eq!(scope.ordered_ids(), after_first);
        scope.assert_dense();
    }

    #[test]
    fn reorder_must_name_the_exact_membership() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let current = vec![a, b, c];

        assert!(validate_reorder(&current, &[c, a, b]).is_ok());
        assert!(matches!(
            validate_reorder(&current, &[a, b]),
            Err(StoreError::InvalidReorderSet)
        ));
        assert!(matches!(
            validate_reorder(&current, &[a, b, Uuid::new_v4()]),
            Err(StoreError::InvalidReorderSet)
        ));
        assert!(matches!(
            validate_reorder(&current, &[a, b, b]),
            Err(StoreError::InvalidReorderSet)
        ));
    }

    #[tokio::test]
    async fn same_scope_locks_serialize() {
        let locks = ScopeLocks::new();
        let scope = Uuid::new_v4();

        let guard = locks.lock(scope).await;
        let second = locks.handle(scope);
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }

    #[tokio::test]
    async fn resolved_locks_follow_the_scope_read_under_them() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let locks = ScopeLocks::new();
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();

        // The first resolution sees the old scope; by the time its lock is
        // held the scope has changed, as when a card is moved to another
        // column between the read and the lock.
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver_calls = Arc::clone(&calls);
        let guards = locks
            .lock_resolved(move || {
                let calls = Arc::clone(&resolver_calls);
                async move {
                    let call = calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, StoreError>(if call == 0 { vec![stale] } else { vec![fresh] })
                }
            })
            .await
            .unwrap();

        // Initial read, mismatch under the stale lock, confirmation.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(locks.handle(fresh).try_lock().is_err());
        assert!(locks.handle(stale).try_lock().is_ok());
        drop(guards);
    }

    #[tokio::test]
    async fn resolver_errors_propagate_without_leaving_locks_held() {
        let locks = ScopeLocks::new();
        let scope = Uuid::new_v4();

        let result = locks
            .lock_resolved(|| async { Err::<Vec<Uuid>, _>(StoreError::NotFound("Card not found")) })
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(locks.handle(scope).try_lock().is_ok());
    }

    #[tokio::test]
    async fn idle_scope_entries_are_evicted() {
        let locks = ScopeLocks::new();
        let released = Uuid::new_v4();
        let held = Uuid::new_v4();

        let guard = locks.lock(released).await;
        drop(guard);

        let _guard = locks.lock(held).await;
        let map = locks.inner.lock().unwrap();
        assert!(!map.contains_key(&released));
        assert!(map.contains_key(&held));
    }

    #[tokio::test]
    async fn lock_all_orders_and_dedupes() {
        let locks = ScopeLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let guards = locks.lock_all(&[b, a, b]).await;
        assert_eq!(guards.len(), 2);
        drop(guards);

        // Both orders of the same pair must be acquirable afterwards.
        let forward = locks.lock_all(&[a, b]).await;
        drop(forward);
        let backward = locks.lock_all(&[b, a]).await;
        drop(backward);
    }
}
