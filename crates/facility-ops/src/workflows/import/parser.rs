use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One CSV row after trimming, before conversion into a work item.
#[derive(Debug, Deserialize)]
pub(crate) struct WorkItemRow {
    #[serde(rename = "ID")]
    pub(crate) id: String,
    #[serde(rename = "Business Name", default, deserialize_with = "empty_string_as_none")]
    pub(crate) business_name: Option<String>,
    #[serde(rename = "Task Type")]
    pub(crate) task_type: String,
    #[serde(rename = "Status")]
    pub(crate) status: String,
    #[serde(rename = "Title", default)]
    pub(crate) title: String,
    #[serde(rename = "Created At")]
    pub(crate) created_at: String,
    #[serde(rename = "Assignee", default, deserialize_with = "empty_string_as_none")]
    pub(crate) assignee: Option<String>,
    #[serde(rename = "Due Date", default, deserialize_with = "empty_string_as_none")]
    pub(crate) due_date: Option<String>,
    #[serde(rename = "Active", default, deserialize_with = "empty_string_as_none")]
    pub(crate) active: Option<String>,
    #[serde(rename = "Deleted", default, deserialize_with = "empty_string_as_none")]
    pub(crate) deleted: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<WorkItemRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<WorkItemRow>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|dt| dt.date_naive()))
}

pub(crate) fn parse_flag(value: Option<&str>, default: bool) -> Option<bool> {
    let Some(raw) = value else {
        return Some(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
