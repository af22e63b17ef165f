use std::time::Duration;

use super::*;
use crate::{
    error::BackendError,
    plan::PlanError,
    test_support::{bracket_plan_json, fast_policy, stock, verdict, FakeBackend},
    view::StockAnnotation,
};
use serde_json::json;
use shared::domain::StockStatus;

fn orchestrator(backend: &Arc<FakeBackend>) -> WorkflowOrchestrator {
    WorkflowOrchestrator::new(backend.clone(), fast_policy())
}

fn short_bracket_backend() -> FakeBackend {
    FakeBackend::default()
        .with_plan(bracket_plan_json())
        .with_inventory(vec![verdict(
            "P-100",
            StockStatus::OutOfStockLocal,
            0,
            "Station 2",
        )])
}

#[tokio::test]
async fn empty_prompt_makes_no_network_call() {
    let backend = Arc::new(short_bracket_backend());
    let mut workflow = orchestrator(&backend);
    let mut events = workflow.subscribe_events();

    for prompt in ["", "   \n\t"] {
        let err = workflow.generate_plan(prompt).await.expect_err("empty");
        assert!(matches!(err, WorkflowError::EmptyPrompt));
    }

    assert_eq!(backend.total_calls(), 0);
    assert!(workflow.context().plan().is_none());
    assert!(matches!(
        events.try_recv(),
        Ok(WorkflowEvent::Notification {
            severity: Severity::Error,
            ..
        })
    ));
}

#[tokio::test]
async fn scenario_a_marks_bracket_out_of_stock_at_station_two() {
    let backend = Arc::new(short_bracket_backend());
    let mut workflow = orchestrator(&backend);
    let mut events = workflow.subscribe_events();

    let view = workflow
        .generate_plan("build bracket assembly")
        .await
        .expect("plan")
        .clone();

    let sent = backend.inventory_requests.lock().expect("lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].parts[0].part_number, "P-100");
    assert_eq!(sent[0].parts[0].location, "Station 2");

    let row = view.row("P-100").expect("row");
    assert_eq!(
        row.annotation(),
        StockAnnotation::OutOfStock {
            required_at: "Station 2".into()
        }
    );
    assert_eq!(view.shortages().count(), 1);
    assert_eq!(workflow.context().prompt(), Some("build bracket assembly"));

    match events.try_recv() {
        Ok(WorkflowEvent::PlanReady(ready)) => assert_eq!(ready, view),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn scenario_b_offers_station_five_for_deficit_of_four() {
    let backend = Arc::new(
        short_bracket_backend()
            .with_locations(vec![stock("Station 5", 10)])
            .with_ack(),
    );
    let mut workflow = orchestrator(&backend);
    workflow
        .generate_plan("build bracket assembly")
        .await
        .expect("plan");

    let session = workflow.open_shortage("P-100").await.expect("open");
    let ShortageState::LocationsAvailable(resolution) = session.state() else {
        panic!("unexpected state: {:?}", session.state());
    };
    assert_eq!(resolution.deficit, 4);
    assert_eq!(resolution.sources, vec![stock("Station 5", 10)]);

    workflow.select_source("Station 5").expect("select");
    let plan_before = workflow.context().plan().cloned();
    workflow.submit_sourcing_request().await.expect("submit");

    assert_eq!(workflow.context().plan().cloned(), plan_before);
    let submitted = backend.submitted.lock().expect("lock").clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].from_location, "Station 5");
    assert_eq!(submitted[0].to_location, "Station 2");
    assert_eq!(submitted[0].quantity, 4);
}

#[tokio::test]
async fn scenario_c_reports_no_supply_without_submit_path() {
    let backend = Arc::new(short_bracket_backend().with_locations(Vec::new()));
    let mut workflow = orchestrator(&backend);
    workflow
        .generate_plan("build bracket assembly")
        .await
        .expect("plan");
    let mut events = workflow.subscribe_events();

    let session = workflow.open_shortage("P-100").await.expect("open");
    assert_eq!(session.state(), &ShortageState::NoSupplyFound);

    assert!(workflow.select_source("Station 5").is_err());
    assert!(matches!(
        workflow.submit_sourcing_request().await,
        Err(WorkflowError::InvalidTransition(_))
    ));
    assert_eq!(backend.calls("submit_sourcing_request"), 0);

    let mut saw_no_supply_notice = false;
    while let Ok(event) = events.try_recv() {
        if let WorkflowEvent::Notification { message, .. } = event {
            saw_no_supply_notice |= message.contains("No stock of P-100");
        }
    }
    assert!(saw_no_supply_notice);
}

#[tokio::test]
async fn plan_generation_failure_keeps_previous_plan() {
    let backend = Arc::new(short_bracket_backend());
    let mut workflow = orchestrator(&backend);
    workflow.generate_plan("first run").await.expect("plan");
    let before = workflow.context().view().cloned();

    let failing = Arc::new(FakeBackend::default().with_plan_error(BackendError::Status {
        status: 500,
        body: "AI model is not configured".into(),
    }));
    workflow.backend = failing.clone();

    let err = workflow.generate_plan("second run").await.expect_err("fail");
    assert!(matches!(err, WorkflowError::PlanGenerationFailed(_)));
    assert!(err.aborts_plan_run());
    assert_eq!(workflow.context().view().cloned(), before);
    assert_eq!(workflow.context().prompt(), Some("first run"));
    // Plan generation is never retried.
    assert_eq!(failing.calls("generate_plan"), 1);
    assert_eq!(failing.calls("check_inventory"), 0);
}

#[tokio::test]
async fn malformed_plan_aborts_before_inventory_check() {
    let backend = Arc::new(
        FakeBackend::default()
            .with_plan(json!({ "eBOM_parts": [{ "part_number": "P-1" }] }))
            .with_inventory(Vec::new()),
    );
    let mut workflow = orchestrator(&backend);

    let err = workflow.generate_plan("anything").await.expect_err("fail");
    assert!(matches!(err, WorkflowError::MalformedPlan(_)));
    assert_eq!(backend.calls("check_inventory"), 0);
    assert!(workflow.context().plan().is_none());
}

#[tokio::test]
async fn inventory_failure_discards_the_new_plan() {
    let backend = Arc::new(short_bracket_backend());
    let mut workflow = orchestrator(&backend);
    workflow.generate_plan("first run").await.expect("plan");
    let before = workflow.context().plan().cloned();

    workflow.backend = Arc::new(
        FakeBackend::default()
            .with_plan(json!({
                "eBOM_parts": [{ "part_number": "Z-9", "name": "Other", "quantity": 1 }],
                "mBOM_steps": []
            }))
            .with_inventory_error(BackendError::Status {
                status: 400,
                body: "Invalid request".into(),
            }),
    );

    let err = workflow.generate_plan("second run").await.expect_err("fail");
    assert!(matches!(err, WorkflowError::InventoryCheckFailed(_)));
    assert_eq!(workflow.context().plan().cloned(), before);
}

#[tokio::test]
async fn hung_collaborator_times_out() {
    let backend = Arc::new(short_bracket_backend().with_delay(Duration::from_secs(5)));
    let mut workflow = WorkflowOrchestrator::new(
        backend.clone(),
        CallPolicy {
            timeout: Duration::from_millis(20),
            read_attempts: 1,
            retry_delay: Duration::from_millis(1),
        },
    );

    let err = workflow.generate_plan("build").await.expect_err("timeout");
    assert!(matches!(
        err,
        WorkflowError::PlanGenerationFailed(BackendError::Timeout { .. })
    ));
}

#[tokio::test]
async fn shortage_requires_plan_and_short_part() {
    let backend = Arc::new(
        FakeBackend::default()
            .with_plan(json!({
                "eBOM_parts": [
                    { "part_number": "P-100", "name": "Bracket", "quantity": 4 },
                    { "part_number": "SCR-M4-001", "name": "M4 Screw", "quantity": 20 }
                ],
                "mBOM_steps": [{ "step": "Install Bracket P-100", "location": "Station 2" }]
            }))
            .with_inventory(vec![
                verdict("P-100", StockStatus::OutOfStockLocal, 0, "Station 2"),
                verdict("SCR-M4-001", StockStatus::InStockLocal, 150, "Main Warehouse"),
            ]),
    );
    let mut workflow = orchestrator(&backend);

    assert!(matches!(
        workflow.open_shortage("P-100").await,
        Err(WorkflowError::NoActivePlan)
    ));
    assert!(matches!(
        workflow.select_source("Station 5"),
        Err(WorkflowError::NoActiveResolution)
    ));

    workflow.generate_plan("build").await.expect("plan");
    assert!(matches!(
        workflow.open_shortage("SCR-M4-001").await,
        Err(WorkflowError::PartNotShort(_))
    ));
    assert!(matches!(
        workflow.open_shortage("NOPE").await,
        Err(WorkflowError::UnknownPart(_))
    ));
    assert_eq!(backend.calls("locate_part"), 0);
}

#[tokio::test]
async fn lookup_failure_is_scoped_to_the_resolution() {
    let backend = Arc::new(short_bracket_backend().with_locations_error(BackendError::Status {
        status: 400,
        body: "part_id is required".into(),
    }));
    let mut workflow = orchestrator(&backend);
    workflow.generate_plan("build").await.expect("plan");
    let before = workflow.context().view().cloned();

    let err = workflow.open_shortage("P-100").await.expect_err("fail");
    assert!(matches!(err, WorkflowError::LocationLookupFailed { .. }));
    assert!(matches!(
        workflow.shortage().map(|s| s.state()),
        Some(ShortageState::LocationsLoadFailed(_))
    ));
    assert_eq!(workflow.context().view().cloned(), before);
}

#[tokio::test]
async fn reopening_starts_a_fresh_resolution() {
    let backend = Arc::new(short_bracket_backend().with_locations(vec![stock("Station 5", 10)]));
    let mut workflow = orchestrator(&backend);
    workflow.generate_plan("build").await.expect("plan");

    workflow.open_shortage("P-100").await.expect("open");
    workflow.select_source("Station 5").expect("select");
    workflow.set_quantity(7).expect("quantity");

    let session = workflow.open_shortage("P-100").await.expect("reopen");
    let ShortageState::LocationsAvailable(resolution) = session.state() else {
        panic!("unexpected state");
    };
    assert!(resolution.selected.is_none());
    assert_eq!(resolution.quantity, 4);
    assert_eq!(backend.calls("locate_part"), 2);

    workflow.close_shortage();
    assert!(workflow.shortage().is_none());
}

#[tokio::test]
async fn new_plan_closes_open_resolution() {
    let backend = Arc::new(short_bracket_backend().with_locations(vec![stock("Station 5", 10)]));
    let mut workflow = orchestrator(&backend);
    workflow.generate_plan("build").await.expect("plan");
    workflow.open_shortage("P-100").await.expect("open");

    workflow.generate_plan("build again").await.expect("plan");
    assert!(workflow.shortage().is_none());
}

#[tokio::test]
async fn non_json_plan_reply_is_malformed() {
    let backend = Arc::new(
        short_bracket_backend()
            .with_plan_error(BackendError::Decode("expected value at line 1".into())),
    );
    let mut workflow = orchestrator(&backend);
    let mut events = workflow.subscribe_events();

    let err = workflow.generate_plan("build").await.expect_err("not json");
    assert!(matches!(
        err,
        WorkflowError::MalformedPlan(PlanError::NotJson(_))
    ));
    assert!(err.aborts_plan_run());
    assert_eq!(backend.calls("check_inventory"), 0);
    assert!(workflow.context().plan().is_none());
    assert!(matches!(
        events.try_recv(),
        Ok(WorkflowEvent::Notification {
            severity: Severity::Error,
            ..
        })
    ));
}

#[tokio::test]
async fn rejected_part_keeps_the_open_resolution() {
    let backend = Arc::new(short_bracket_backend().with_locations(vec![stock("Station 5", 10)]));
    let mut workflow = orchestrator(&backend);
    workflow.generate_plan("build").await.expect("plan");
    workflow.open_shortage("P-100").await.expect("open");
    workflow.select_source("Station 5").expect("select");
    let mut events = workflow.subscribe_events();

    let err = workflow.open_shortage("P-10O").await.expect_err("typo");
    assert!(matches!(err, WorkflowError::UnknownPart(_)));

    let session = workflow.shortage().expect("still open");
    assert_eq!(session.part_number(), "P-100");
    let ShortageState::LocationsAvailable(resolution) = session.state() else {
        panic!("unexpected state");
    };
    assert_eq!(resolution.selected, Some(0));
    assert_eq!(backend.calls("locate_part"), 1);
    assert!(matches!(
        events.try_recv(),
        Ok(WorkflowEvent::Notification {
            severity: Severity::Error,
            ..
        })
    ));
}

#[tokio::test]
async fn rejected_operator_input_is_notified() {
    let backend = Arc::new(short_bracket_backend().with_locations(vec![stock("Station 5", 10)]));
    let mut workflow = orchestrator(&backend);
    let mut events = workflow.subscribe_events();

    assert!(matches!(
        workflow.open_shortage("P-100").await,
        Err(WorkflowError::NoActivePlan)
    ));
    assert!(matches!(
        workflow.submit_sourcing_request().await,
        Err(WorkflowError::NoActiveResolution)
    ));

    workflow.generate_plan("build").await.expect("plan");
    workflow.open_shortage("P-100").await.expect("open");
    assert!(matches!(
        workflow.select_source("Station 9"),
        Err(WorkflowError::UnknownSource(_))
    ));
    assert!(matches!(
        workflow.set_quantity(0),
        Err(WorkflowError::InvalidQuantity)
    ));

    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WorkflowEvent::Notification {
            severity: Severity::Error,
            message,
        } = event
        {
            errors.push(message);
        }
    }
    assert_eq!(errors.len(), 4);
    assert!(errors[0].contains("no plan"));
    assert!(errors[2].contains("Station 9"));
    assert!(errors[3].contains("quantity"));
}
