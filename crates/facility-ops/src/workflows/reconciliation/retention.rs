//! "Newest wins" retention for duplicate groups.
//!
//! Members are ranked by `created_at` descending. Bulk imports can stamp several rows with the
//! same instant, so equal timestamps fall back to the lexicographically smallest id.

use std::cmp::Ordering;

use super::domain::WorkItem;

/// Survivor and removal candidates for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub keep: Option<WorkItem>,
    pub remove: Vec<WorkItem>,
}

fn retention_order(left: &WorkItem, right: &WorkItem) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| left.id.cmp(&right.id))
}

/// Returns the member that survives deduplication, `None` only for an empty slice.
pub fn select_retained(members: &[WorkItem]) -> Option<&WorkItem> {
    members
        .iter()
        .min_by(|left, right| retention_order(left, right))
}

/// Ranks `members` and splits off the survivor. Advisory only: nothing is written.
pub fn plan(mut members: Vec<WorkItem>) -> RetentionPlan {
    members.sort_by(retention_order);
    let mut ranked = members.into_iter();
    let keep = ranked.next();
    RetentionPlan {
        keep,
        remove: ranked.collect(),
    }
}
