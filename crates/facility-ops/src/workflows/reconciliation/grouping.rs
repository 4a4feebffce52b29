use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::WorkItem;
use super::retention::{self, RetentionPlan};
use super::store::{sort_by_keys, SortKey};

/// Composite identity of a work item for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateKey {
    pub business_name: String,
    pub task_type: String,
    pub status: String,
}

impl DuplicateKey {
    pub fn of(item: &WorkItem) -> Self {
        Self {
            business_name: item.business_name_or_empty().to_string(),
            task_type: item.task_type.clone(),
            status: item.status.clone(),
        }
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.business_name, self.task_type, self.status
        )
    }
}

/// Two or more live work items sharing a [`DuplicateKey`].
///
/// Members are ordered newest first; the first member is the retained record. Groups are only
/// built by [`select_duplicates`], so `members` always holds at least two items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    key: DuplicateKey,
    members: Vec<WorkItem>,
}

impl DuplicateGroup {
    pub fn key(&self) -> &DuplicateKey {
        &self.key
    }

    pub fn members(&self) -> &[WorkItem] {
        &self.members
    }

    pub fn retained(&self) -> &WorkItem {
        &self.members[0]
    }

    pub fn redundant(&self) -> &[WorkItem] {
        &self.members[1..]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for groups produced by [`select_duplicates`].
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Deterministic pre-grouping order: business, task type, status, creation time, id.
pub fn sort_for_grouping(items: &mut [WorkItem]) {
    sort_by_keys(items, &SortKey::GROUPING);
}

/// Buckets items by composite key in first-seen order. Members keep their input order.
///
/// Callers pass only active, non-deleted items; filtering belongs to the store query.
pub fn group(items: Vec<WorkItem>) -> Vec<(DuplicateKey, Vec<WorkItem>)> {
    debug_assert!(items.iter().all(WorkItem::is_live));

    let mut positions: HashMap<DuplicateKey, usize> = HashMap::new();
    let mut groups: Vec<(DuplicateKey, Vec<WorkItem>)> = Vec::new();

    for item in items {
        let key = DuplicateKey::of(&item);
        match positions.get(&key) {
            Some(&index) => groups[index].1.push(item),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }

    groups
}

/// Groups with at least two members, each reordered so the retained record comes first.
pub fn select_duplicates(items: Vec<WorkItem>) -> Vec<DuplicateGroup> {
    group(items)
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(key, members)| {
            let RetentionPlan { keep, remove } = retention::plan(members);
            let mut ordered = Vec::with_capacity(remove.len() + 1);
            ordered.extend(keep);
            ordered.extend(remove);
            DuplicateGroup {
                key,
                members: ordered,
            }
        })
        .collect()
}
