use crate::infra::{InMemoryChangeLog, InMemoryRecordStore};
use chrono::NaiveDate;
use clap::Args;
use facility_ops::error::AppError;
use facility_ops::workflows::import::{WorkItemImportError, WorkItemImporter};
use facility_ops::workflows::reconciliation::change_log::format_amount;
use facility_ops::workflows::reconciliation::{
    receivable_for, select_duplicates, sort_for_grouping, BusinessFinancials, BusinessId,
    CostChange, CostKind, CostLine, DuplicatesReport, PaymentFields, ReceivableView,
    ReceivablesOverview, ReconciliationService, RetryPolicy, WorkItem, WorkItemFilter,
};
use serde_json::json;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DuplicatesArgs {
    /// Work-item CSV export to scan
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the report as JSON instead of a text listing
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReceivablesArgs {
    /// JSON array of business financial records
    #[arg(long)]
    pub(crate) financials: PathBuf,
    /// Print the overview as JSON instead of a text listing
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_duplicates_report(args: DuplicatesArgs) -> Result<(), AppError> {
    let mut items = WorkItemImporter::from_path(&args.csv)?;
    sort_for_grouping(&mut items);
    let groups = select_duplicates(items);
    let report = DuplicatesReport::from_groups(&groups);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_duplicates_report(&report);
    }
    Ok(())
}

pub(crate) fn run_receivables(args: ReceivablesArgs) -> Result<(), AppError> {
    let businesses = load_financials(&args.financials)?;
    let views: Vec<ReceivableView> = businesses.iter().map(receivable_for).collect();
    let overview = ReceivablesOverview::new(views, Vec::new());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        render_receivables(&overview);
    }
    Ok(())
}

pub(crate) fn load_financials(path: &Path) -> Result<Vec<BusinessFinancials>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn run_demo() -> Result<(), AppError> {
    println!("Work-item reconciliation demo");

    let store = Arc::new(InMemoryRecordStore::seeded(
        demo_work_items()?,
        demo_businesses(),
    ));
    let change_log = Arc::new(InMemoryChangeLog::default());
    let service = ReconciliationService::new(
        store.clone(),
        change_log.clone(),
        RetryPolicy::default(),
    );

    let filter = WorkItemFilter::default();
    let report = service.duplicates_report(&filter)?;
    render_duplicates_report(&report);

    let summary = service.resolve_duplicates(&filter)?;
    println!(
        "\nResolved duplicates: {} soft-deleted | {} failed",
        summary.success_count(),
        summary.failed_count()
    );
    for failure in summary.errors() {
        println!("  - {}: {}", failure.id, failure.error);
    }

    let remaining = service.duplicates_report(&filter)?;
    println!("Remaining duplicate groups: {}", remaining.summary.total_groups);

    println!();
    let overview = service.receivables_overview(&store.business_ids())?;
    render_receivables(&overview);

    println!("\nCost change");
    let report = service.apply_cost_change(
        &BusinessId("biz-hanbit".to_string()),
        CostChange::Update {
            kind: CostKind::OperatingCost,
            label: None,
            amount: 150_000,
        },
        "Park",
    )?;
    println!("- {}", report.description);
    println!("  change log: {}", json!(report.audit));
    println!("  records stored: {}", change_log.records().len());

    Ok(())
}

fn render_duplicates_report(report: &DuplicatesReport) {
    println!(
        "Duplicate groups: {} | duplicate items: {} | to delete: {}",
        report.summary.total_groups, report.summary.total_duplicates, report.summary.to_delete
    );
    for group in &report.groups {
        println!("- {} ({} items)", group.key, group.count);
        for member in &group.members {
            let marker = if member.keep { "keep" } else { "delete" };
            println!(
                "    [{}] {} | {} | created {}",
                marker,
                member.id,
                member.title,
                member.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
}

fn render_receivables(overview: &ReceivablesOverview) {
    println!(
        "Receivables across {} businesses: {}",
        overview.businesses.len(),
        format_amount(overview.total_receivable)
    );
    for view in &overview.businesses {
        let installed = view
            .installation_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "not installed".to_string());
        println!(
            "- {} [{}] revenue {} | paid {} | outstanding {} ({})",
            view.business_name,
            view.payment_series.label(),
            format_amount(view.total_revenue_with_tax),
            format_amount(view.total_payments),
            format_amount(view.receivable),
            installed
        );
    }
    for missing in &overview.missing {
        println!("- {}: no financial record", missing);
    }
}

const DEMO_WORK_ITEMS: &str = "\
ID,Business Name,Task Type,Status,Title,Created At,Assignee,Due Date,Active,Deleted
wi-101,Hanbit Clinic,subsidy,pending,Submit subsidy paperwork,2024-03-01T09:00:00+09:00,Kim,2024-03-15,true,false
wi-102,Hanbit Clinic,subsidy,pending,Submit subsidy paperwork,2024-03-02T09:00:00+09:00,Kim,2024-03-15,true,false
wi-103,Hanbit Clinic,subsidy,pending,Submit subsidy paperwork,2024-03-03T09:00:00+09:00,Lee,2024-03-20,true,false
wi-104,Hanbit Clinic,as,done,Replace sensor,2024-03-04,Choi,,true,false
wi-105,Daeil Logistics,survey,pending,Site survey,2024-03-05,,,true,false
wi-106,Daeil Logistics,survey,pending,Site survey,2024-03-06,,,false,false
";

pub(crate) fn demo_work_items() -> Result<Vec<WorkItem>, WorkItemImportError> {
    WorkItemImporter::from_reader(Cursor::new(DEMO_WORK_ITEMS))
}

pub(crate) fn demo_businesses() -> Vec<BusinessFinancials> {
    vec![
        BusinessFinancials {
            business_id: BusinessId("biz-hanbit".to_string()),
            business_name: "Hanbit Clinic".to_string(),
            progress_status: "보조금 2차".to_string(),
            installation_date: NaiveDate::from_ymd_opt(2024, 2, 15),
            total_revenue_with_tax: 11_000_000,
            payments: PaymentFields {
                subsidy_first_installment: Some(json!(4_000_000)),
                subsidy_second_installment: Some(json!("3,000,000원")),
                self_pay_advance: Some(json!(500_000)),
                ..PaymentFields::default()
            },
            costs: vec![CostLine {
                kind: CostKind::OperatingCost,
                label: None,
                amount: 120_000,
            }],
        },
        BusinessFinancials {
            business_id: BusinessId("biz-daeil".to_string()),
            business_name: "Daeil Logistics".to_string(),
            progress_status: "자부담".to_string(),
            installation_date: None,
            total_revenue_with_tax: 5_500_000,
            payments: PaymentFields {
                self_pay_advance: Some(json!(2_000_000)),
                ..PaymentFields::default()
            },
            costs: Vec::new(),
        },
        BusinessFinancials {
            business_id: BusinessId("biz-seoul".to_string()),
            business_name: "Seoul Dental".to_string(),
            progress_status: "자부담".to_string(),
            installation_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            total_revenue_with_tax: 3_300_000,
            payments: PaymentFields {
                self_pay_advance: Some(json!(1_000_000)),
                self_pay_balance: Some(json!("1,300,000")),
                ..PaymentFields::default()
            },
            costs: Vec::new(),
        },
    ]
}
