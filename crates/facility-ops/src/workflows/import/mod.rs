mod parser;

use crate::workflows::reconciliation::domain::{WorkItem, WorkItemId};
use std::io::Read;
use std::path::Path;

use parser::WorkItemRow;

#[derive(Debug)]
pub enum WorkItemImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { row: usize, reason: String },
}

impl std::fmt::Display for WorkItemImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkItemImportError::Io(err) => write!(f, "failed to read work-item export: {}", err),
            WorkItemImportError::Csv(err) => write!(f, "invalid work-item CSV data: {}", err),
            WorkItemImportError::InvalidRow { row, reason } => {
                write!(f, "work-item export row {}: {}", row, reason)
            }
        }
    }
}

impl std::error::Error for WorkItemImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkItemImportError::Io(err) => Some(err),
            WorkItemImportError::Csv(err) => Some(err),
            WorkItemImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for WorkItemImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for WorkItemImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads live work items from a CSV export of the work-item table.
pub struct WorkItemImporter;

impl WorkItemImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<WorkItem>, WorkItemImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Inactive and deleted rows are dropped; the result only holds live items.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<WorkItem>, WorkItemImportError> {
        let mut items = Vec::new();

        for (index, row) in parser::parse_rows(reader)?.into_iter().enumerate() {
            // Header is line 1.
            let item = convert_row(index + 2, row)?;
            if item.is_live() {
                items.push(item);
            }
        }

        Ok(items)
    }
}

fn convert_row(row_number: usize, row: WorkItemRow) -> Result<WorkItem, WorkItemImportError> {
    let invalid = |reason: String| WorkItemImportError::InvalidRow {
        row: row_number,
        reason,
    };

    if row.id.trim().is_empty() {
        return Err(invalid("missing ID".to_string()));
    }

    let created_at = parser::parse_timestamp(&row.created_at)
        .ok_or_else(|| invalid(format!("unparseable Created At '{}'", row.created_at)))?;
    let is_active = parser::parse_flag(row.active.as_deref(), true)
        .ok_or_else(|| invalid(format!("unrecognized Active flag {:?}", row.active)))?;
    let is_deleted = parser::parse_flag(row.deleted.as_deref(), false)
        .ok_or_else(|| invalid(format!("unrecognized Deleted flag {:?}", row.deleted)))?;

    Ok(WorkItem {
        id: WorkItemId(row.id),
        business_name: row.business_name,
        task_type: row.task_type,
        status: row.status,
        title: row.title,
        created_at,
        assignee: row.assignee,
        due_date: row.due_date.as_deref().and_then(parser::parse_date),
        is_active,
        is_deleted,
        updated_at: None,
    })
}
