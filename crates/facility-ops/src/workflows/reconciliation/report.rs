use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{WorkItem, WorkItemId};
use super::grouping::{DuplicateGroup, DuplicateKey};

/// Duplicates report in the shape external callers rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatesReport {
    pub groups: Vec<DuplicateGroupView>,
    pub summary: DuplicatesSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroupView {
    pub key: DuplicateKey,
    pub count: usize,
    pub members: Vec<DuplicateMemberView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMemberView {
    pub id: WorkItemId,
    pub keep: bool,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatesSummary {
    pub total_groups: usize,
    /// Items that belong to some duplicate group, survivors included.
    pub total_duplicates: usize,
    pub to_delete: usize,
}

impl DuplicatesReport {
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        let views: Vec<DuplicateGroupView> = groups.iter().map(DuplicateGroupView::from).collect();
        let total_duplicates = groups.iter().map(DuplicateGroup::len).sum::<usize>();
        let to_delete = groups.iter().map(|group| group.redundant().len()).sum();

        Self {
            summary: DuplicatesSummary {
                total_groups: views.len(),
                total_duplicates,
                to_delete,
            },
            groups: views,
        }
    }

    /// Ids of every member not marked keep, in report order.
    pub fn deletion_candidates(&self) -> Vec<WorkItemId> {
        self.groups
            .iter()
            .flat_map(|group| group.members.iter())
            .filter(|member| !member.keep)
            .map(|member| member.id.clone())
            .collect()
    }
}

impl From<&DuplicateGroup> for DuplicateGroupView {
    fn from(group: &DuplicateGroup) -> Self {
        let members = group
            .members()
            .iter()
            .enumerate()
            .map(|(index, item)| DuplicateMemberView::new(item, index == 0))
            .collect();

        Self {
            key: group.key().clone(),
            count: group.len(),
            members,
        }
    }
}

impl DuplicateMemberView {
    fn new(item: &WorkItem, keep: bool) -> Self {
        Self {
            id: item.id.clone(),
            keep,
            title: item.title.clone(),
            created_at: item.created_at,
            assignee: item.assignee.clone(),
            due_date: item.due_date,
        }
    }
}
