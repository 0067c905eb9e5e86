//! Reconciliation
//!
//! Merges an authoritative remote snapshot with local unsynced state,
//! deduplicating by server identity. The merge is pure and idempotent; it
//! runs on every periodic refresh, so merging its own output with the same
//! snapshot must change nothing.
//!
//! Rules:
//!
//! - Every remote item becomes a `Synced` local todo, overwriting any local
//!   item that shares its server id (local identity and creation time are
//!   preserved so the UI stays stable).
//! - Local items still pending, syncing, or unknown to the server are kept
//!   in their local form.
//! - A previously-synced local item whose server id is missing from the
//!   snapshot was deleted elsewhere and is dropped. This is also correct
//!   when a local delete for it is still queued: the remote delete will
//!   just report it already gone.
//!
//! Order: remote items first (server-ordered, newest first), then remaining
//! unsynced local items by creation time descending.

use std::collections::{HashMap, HashSet};

use crate::models::{LocalTodo, ServerTodo};

/// Merge a remote snapshot against the local todo list
pub fn merge(remote: &[ServerTodo], local: &[LocalTodo]) -> Vec<LocalTodo> {
    let remote_ids: HashSet<i64> = remote.iter().map(|r| r.id).collect();

    let by_server_id: HashMap<i64, &LocalTodo> = local
        .iter()
        .filter_map(|t| t.server_id.map(|id| (id, t)))
        .collect();

    let mut merged: Vec<LocalTodo> = Vec::with_capacity(remote.len());
    for item in remote {
        let todo = match by_server_id.get(&item.id) {
            Some(existing) => {
                let mut todo = (*existing).clone();
                todo.apply_remote(item);
                todo
            }
            None => LocalTodo::from_remote(item),
        };
        merged.push(todo);
    }

    // Keep anything still pending or unknown to the server; everything else
    // was either emitted above or deleted server-side.
    let mut unsynced: Vec<LocalTodo> = local
        .iter()
        .filter(|t| !t.is_synced() || t.server_id.is_none())
        .filter(|t| t.server_id.map_or(true, |id| !remote_ids.contains(&id)))
        .cloned()
        .collect();
    unsynced.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    merged.extend(unsynced);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use chrono::{Duration, Utc};

    fn remote(id: i64, title: &str) -> ServerTodo {
        ServerTodo {
            id,
            title: title.to_string(),
            description: None,
            completed: false,
            image_url: None,
        }
    }

    fn synced(server_id: i64, title: &str) -> LocalTodo {
        let mut todo = LocalTodo::new(title, None);
        todo.apply_remote(&remote(server_id, title));
        todo
    }

    #[test]
    fn test_remote_first_then_pending() {
        // Reconciliation scenario: one synced item confirmed by the server,
        // one pending item the server does not know yet.
        let snapshot = vec![remote(1, "A")];
        let local = vec![synced(1, "A"), LocalTodo::new("B", None)];

        let merged = merge(&snapshot, &local);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].server_id, Some(1));
        assert_eq!(merged[0].title, "A");
        assert!(merged[0].is_synced());
        assert_eq!(merged[1].title, "B");
        assert_eq!(merged[1].sync_status, SyncStatus::Pending);
        assert!(merged[1].server_id.is_none());
    }

    #[test]
    fn test_stale_synced_item_dropped() {
        // Item 9 was deleted elsewhere; an empty snapshot removes it.
        let local = vec![synced(9, "stale")];
        let merged = merge(&[], &local);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_pending_item_survives_empty_snapshot() {
        let local = vec![LocalTodo::new("offline", None)];
        let merged = merge(&[], &local);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_remote_overwrites_shared_server_id() {
        // Server renamed the item; local synced copy is overwritten but
        // keeps its local identity.
        let local = vec![synced(5, "old title")];
        let local_id = local[0].local_id;
        let created_at = local[0].created_at;

        let merged = merge(&[remote(5, "new title")], &local);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "new title");
        assert_eq!(merged[0].local_id, local_id);
        assert_eq!(merged[0].created_at, created_at);
    }

    #[test]
    fn test_unknown_remote_items_materialize() {
        let merged = merge(&[remote(3, "new")], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].server_id, Some(3));
        assert!(merged[0].is_synced());
        assert!(merged[0].invariant_holds());
    }

    #[test]
    fn test_remote_order_preserved() {
        let snapshot = vec![remote(2, "newer"), remote(1, "older")];
        let merged = merge(&snapshot, &[]);
        assert_eq!(merged[0].server_id, Some(2));
        assert_eq!(merged[1].server_id, Some(1));
    }

    #[test]
    fn test_pending_ties_broken_by_created_at_desc() {
        let mut older = LocalTodo::new("older", None);
        older.created_at = Utc::now() - Duration::seconds(10);
        let newer = LocalTodo::new("newer", None);

        let merged = merge(&[], &[older.clone(), newer.clone()]);
        assert_eq!(merged[0].local_id, newer.local_id);
        assert_eq!(merged[1].local_id, older.local_id);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let snapshot = vec![remote(2, "B"), remote(1, "A")];
        let mut pending = LocalTodo::new("offline", None);
        pending.created_at = Utc::now() - Duration::seconds(5);
        let local = vec![synced(1, "A"), pending, synced(4, "deleted elsewhere")];

        let once = merge(&snapshot, &local);
        let twice = merge(&snapshot, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_output_upholds_invariant() {
        let snapshot = vec![remote(1, "A")];
        let local = vec![LocalTodo::new("pending", None), synced(1, "A")];
        for todo in merge(&snapshot, &local) {
            assert!(todo.invariant_holds(), "invariant broken for {:?}", todo);
        }
    }
}
