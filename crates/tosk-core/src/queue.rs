//! Pending action queue
//!
//! An ordered sequence of not-yet-confirmed mutations. Ordering is explicit:
//! actions are kept in insertion order and dispatched FIFO, which also gives
//! FIFO-per-target (an update or delete queued behind a create for the same
//! todo is never dispatched first). Only one action is ever in flight at a
//! time; that rule is enforced by the orchestrator, not here.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::models::QueuedAction;

/// Ordered queue of pending mutations with retry bookkeeping
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: Vec<QueuedAction>,
}

impl ActionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from persisted actions, preserving order
    pub fn from_actions(actions: Vec<QueuedAction>) -> Self {
        Self { actions }
    }

    /// All queued actions in insertion order
    pub fn actions(&self) -> &[QueuedAction] {
        &self.actions
    }

    /// Append an action to the end of the queue
    pub fn enqueue(&mut self, action: QueuedAction) {
        self.actions.push(action);
    }

    /// Number of queued actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Look up an action by id
    pub fn get(&self, action_id: Uuid) -> Option<&QueuedAction> {
        self.actions.iter().find(|a| a.action_id == action_id)
    }

    /// The oldest action eligible for dispatch
    ///
    /// Eligible means `retry_count` below the ceiling and not in the `skip`
    /// set (actions the orchestrator has deferred this round because their
    /// dependency has not resolved yet).
    pub fn next_eligible(&self, retry_limit: u32, skip: &HashSet<Uuid>) -> Option<&QueuedAction> {
        self.actions
            .iter()
            .find(|a| a.retry_count < retry_limit && !skip.contains(&a.action_id))
    }

    /// Remove an action by id, returning it if present
    pub fn remove(&mut self, action_id: Uuid) -> Option<QueuedAction> {
        let pos = self.actions.iter().position(|a| a.action_id == action_id)?;
        Some(self.actions.remove(pos))
    }

    /// Record a failed attempt: increment the retry counter and stamp the
    /// attempt time. Returns the new count, or `None` if the action is gone.
    pub fn bump_retry(&mut self, action_id: Uuid) -> Option<u32> {
        let action = self
            .actions
            .iter_mut()
            .find(|a| a.action_id == action_id)?;
        action.retry_count += 1;
        action.last_attempt_at = Some(Utc::now());
        Some(action.retry_count)
    }

    /// Remove and return every action at or over the retry ceiling
    ///
    /// A persisted action can sit over the ceiling after `retry_limit` is
    /// lowered; `next_eligible` would skip it forever, so the engine drops
    /// it at load time and flags its todo.
    pub fn drain_over_limit(&mut self, retry_limit: u32) -> Vec<QueuedAction> {
        let actions = std::mem::take(&mut self.actions);
        let (over, keep) = actions
            .into_iter()
            .partition(|a| a.retry_count >= retry_limit);
        self.actions = keep;
        over
    }

    /// Drop every queued action targeting the given todo
    ///
    /// Used when a never-synced todo is deleted: its pending create (and any
    /// updates behind it) have nothing left to reconcile. Returns how many
    /// actions were removed.
    pub fn purge_target(&mut self, target_local_id: Uuid) -> usize {
        let before = self.actions.len();
        self.actions.retain(|a| a.target_local_id != target_local_id);
        before - self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalTodo;

    fn create_action() -> (LocalTodo, QueuedAction) {
        let todo = LocalTodo::new("test", None);
        let action = QueuedAction::create(&todo);
        (todo, action)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = ActionQueue::new();
        let (_, a) = create_action();
        let (_, b) = create_action();
        let (_, c) = create_action();
        let ids = [a.action_id, b.action_id, c.action_id];

        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert_eq!(queue.len(), 3);
        for expected in ids {
            let next = queue.next_eligible(3, &HashSet::new()).unwrap().action_id;
            assert_eq!(next, expected);
            queue.remove(next);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_next_eligible_skips_deferred() {
        let mut queue = ActionQueue::new();
        let (_, a) = create_action();
        let (_, b) = create_action();
        let a_id = a.action_id;
        let b_id = b.action_id;

        queue.enqueue(a);
        queue.enqueue(b);

        let mut skip = HashSet::new();
        skip.insert(a_id);

        assert_eq!(queue.next_eligible(3, &skip).unwrap().action_id, b_id);
    }

    #[test]
    fn test_next_eligible_respects_retry_ceiling() {
        let mut queue = ActionQueue::new();
        let (_, action) = create_action();
        let id = action.action_id;
        queue.enqueue(action);

        assert_eq!(queue.bump_retry(id), Some(1));
        assert_eq!(queue.bump_retry(id), Some(2));
        assert!(queue.next_eligible(3, &HashSet::new()).is_some());

        assert_eq!(queue.bump_retry(id), Some(3));
        // At the ceiling the action is no longer dispatchable
        assert!(queue.next_eligible(3, &HashSet::new()).is_none());
        // But it is still in the queue until the orchestrator drops it
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_bump_retry_stamps_attempt_time() {
        let mut queue = ActionQueue::new();
        let (_, action) = create_action();
        let id = action.action_id;
        queue.enqueue(action);

        assert!(queue.get(id).unwrap().last_attempt_at.is_none());
        queue.bump_retry(id);
        assert!(queue.get(id).unwrap().last_attempt_at.is_some());
    }

    #[test]
    fn test_bump_retry_missing_action() {
        let mut queue = ActionQueue::new();
        assert_eq!(queue.bump_retry(Uuid::new_v4()), None);
    }

    #[test]
    fn test_remove() {
        let mut queue = ActionQueue::new();
        let (_, action) = create_action();
        let id = action.action_id;
        queue.enqueue(action);

        let removed = queue.remove(id).unwrap();
        assert_eq!(removed.action_id, id);
        assert!(queue.is_empty());
        assert!(queue.remove(id).is_none());
    }

    #[test]
    fn test_drain_over_limit() {
        let mut queue = ActionQueue::new();
        let (_, fresh) = create_action();
        let (_, worn) = create_action();
        let fresh_id = fresh.action_id;
        let worn_id = worn.action_id;

        queue.enqueue(fresh);
        queue.enqueue(worn);
        queue.bump_retry(worn_id);
        queue.bump_retry(worn_id);

        let over = queue.drain_over_limit(2);
        assert_eq!(over.len(), 1);
        assert_eq!(over[0].action_id, worn_id);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.actions()[0].action_id, fresh_id);
    }

    #[test]
    fn test_purge_target() {
        let mut queue = ActionQueue::new();
        let todo = LocalTodo::new("target", None);
        let (_, other) = create_action();

        queue.enqueue(QueuedAction::create(&todo));
        queue.enqueue(QueuedAction::update(
            todo.local_id,
            None,
            None,
            Some(true),
        ));
        queue.enqueue(other.clone());

        assert_eq!(queue.purge_target(todo.local_id), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.actions()[0].action_id, other.action_id);
    }
}
