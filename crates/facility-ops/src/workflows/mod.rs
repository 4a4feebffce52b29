pub mod import;
pub mod reconciliation;
