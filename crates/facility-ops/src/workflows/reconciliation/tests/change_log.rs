use super::common::*;
use crate::workflows::reconciliation::change_log::{
    describe_cost_change, format_amount, ChangeAction, ChangeRecord, ChangeRecorder,
    RecordingOutcome, RetryPolicy,
};
use crate::workflows::reconciliation::domain::{BusinessId, CostKind};
use std::sync::Arc;
use std::time::Duration;

fn record() -> ChangeRecord {
    ChangeRecord {
        business_id: BusinessId("biz-subsidy".to_string()),
        change_type: CostKind::SurveyFee,
        action: ChangeAction::Updated,
        before: Some(50_000),
        after: Some(80_000),
        description: "survey fee updated: 50,000 -> 80,000".to_string(),
        author_name: "Park".to_string(),
        recorded_at: at(4, 15),
    }
}

fn recorder(
    failures: u32,
) -> (
    ChangeRecorder<FlakySink, RecordingSleeper>,
    Arc<FlakySink>,
    Arc<RecordingSleeper>,
) {
    let sink = Arc::new(FlakySink::failing(failures));
    let sleeper = Arc::new(RecordingSleeper::default());
    let recorder = ChangeRecorder::with_sleeper(sink.clone(), sleeper.clone(), retry_policy());
    (recorder, sink, sleeper)
}

#[test]
fn first_attempt_success_does_not_sleep() {
    let (recorder, sink, sleeper) = recorder(0);

    let outcome = recorder.record(&record());

    assert_eq!(outcome, RecordingOutcome::Recorded { attempts: 1 });
    assert_eq!(sink.records(), vec![record()]);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn transient_failures_retry_with_exponential_backoff() {
    let (recorder, sink, sleeper) = recorder(2);

    let outcome = recorder.record(&record());

    assert_eq!(outcome, RecordingOutcome::Recorded { attempts: 3 });
    assert_eq!(sink.attempts(), 3);
    assert_eq!(sink.records().len(), 1, "record written exactly once");
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[test]
fn exhausted_budget_abandons_without_error() {
    let (recorder, sink, sleeper) = recorder(10);

    let outcome = recorder.record(&record());

    match outcome {
        RecordingOutcome::Abandoned {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 4);
            assert!(last_error.contains("audit table locked"));
        }
        other => panic!("expected abandoned outcome, got {other:?}"),
    }
    assert_eq!(sink.attempts(), 4);
    assert!(sink.records().is_empty());
    // Third delay would be 400ms; capped at 250ms.
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(250),
        ]
    );
}

#[test]
fn zero_retry_budget_makes_a_single_attempt() {
    let sink = Arc::new(FlakySink::failing(1));
    let sleeper = Arc::new(RecordingSleeper::default());
    let policy = RetryPolicy {
        max_retries: 0,
        ..retry_policy()
    };
    let recorder = ChangeRecorder::with_sleeper(sink.clone(), sleeper.clone(), policy);

    let outcome = recorder.record(&record());

    assert!(!outcome.is_recorded());
    assert_eq!(outcome.attempts(), 1);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn default_policy_bounds_added_latency() {
    assert_eq!(
        RetryPolicy::default().worst_case_backoff(),
        Duration::from_millis(1_400)
    );

    let (recorder, _, sleeper) = recorder(10);
    recorder.record(&record());
    let slept = sleeper
        .delays()
        .into_iter()
        .fold(Duration::ZERO, |total, delay| total + delay);
    assert_eq!(slept, retry_policy().worst_case_backoff());
    assert_eq!(slept, Duration::from_millis(550));
}

#[test]
fn delay_for_doubles_until_cap() {
    let policy = RetryPolicy {
        max_retries: 10,
        base_delay: Duration::from_millis(200),
        max_delay: Duration::from_secs(5),
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for(5), Duration::from_millis(3_200));
    assert_eq!(policy.delay_for(6), Duration::from_secs(5));
    assert_eq!(policy.delay_for(60), Duration::from_secs(5));
}

#[test]
fn descriptions_cover_each_action() {
    assert_eq!(
        describe_cost_change(
            CostKind::OperatingCost,
            None,
            ChangeAction::Updated,
            Some(120_000),
            Some(150_000),
        ),
        "operating cost updated: 120,000 -> 150,000"
    );
    assert_eq!(
        describe_cost_change(CostKind::AsCost, None, ChangeAction::Added, None, Some(30_000)),
        "A/S cost added: 30,000"
    );
    assert_eq!(
        describe_cost_change(
            CostKind::CustomCost,
            Some(" crane rental "),
            ChangeAction::Deleted,
            Some(1_250_000),
            None,
        ),
        "custom cost 'crane rental' deleted (was 1,250,000)"
    );
}

#[test]
fn format_amount_groups_thousands() {
    assert_eq!(format_amount(0), "0");
    assert_eq!(format_amount(999), "999");
    assert_eq!(format_amount(1_000), "1,000");
    assert_eq!(format_amount(-1_250_000), "-1,250,000");
}
