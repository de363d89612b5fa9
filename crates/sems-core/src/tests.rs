use std::future;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::alert_drafts::{AlertDraftRegister, DraftAction};
use crate::error::{DraftError, PortError, WizardError};
use crate::field_store::FieldStore;
use crate::navigator::{reduce, Outcome, WizardEvent, WizardState};
use crate::ports::{
    AlertUpdater, MockAlertDirectory, MockAlertUpdater, MockRegistrationSubmitter,
    RegistrationSubmitter,
};
use crate::registration::{fixtures::valid_raw, registration_wizard};
use crate::wizard::{SubmitOutcome, WizardShell};
use sems_domain::{
    Alert, AlertDraft, AlertField, AlertType, AlertUpdate, Keyed, RegistrationRequest,
    RegistrationStep, SubmissionReceipt,
};

fn fill(shell: &mut WizardShell, raw: &FieldStore) {
    for (key, value) in raw.iter() {
        shell
            .dispatch(WizardEvent::SetField {
                key: key.to_string(),
                value: value.clone(),
            })
            .expect("set field");
    }
}

/// Walks the shell to the last step with every earlier step committed.
fn shell_on_last_step() -> WizardShell {
    let mut shell = WizardShell::new().expect("wizard");
    for step in &RegistrationStep::ALL[..3] {
        fill(&mut shell, &valid_raw(*step));
        let outcome = shell.go_next().expect("next");
        assert!(matches!(outcome, Outcome::Moved { .. }), "{outcome:?}");
    }
    fill(&mut shell, &valid_raw(RegistrationStep::EnergySupply));
    shell
}

fn receipt() -> SubmissionReceipt {
    SubmissionReceipt {
        reference: "REG-1".into(),
        submitted_at: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
    }
}

#[test]
fn valid_next_sequence_completes_every_step_before_submit() {
    let definition = registration_wizard().unwrap();
    let mut state = WizardState::new(&definition);
    for step in RegistrationStep::ALL {
        for (key, value) in valid_raw(*step).iter() {
            state = reduce(
                &definition,
                &state,
                WizardEvent::SetField {
                    key: key.to_string(),
                    value: value.clone(),
                },
            )
            .unwrap()
            .state;
        }
        let event = if *step == definition.last() {
            WizardEvent::BeginSubmit
        } else {
            WizardEvent::Next
        };
        state = reduce(&definition, &state, event).unwrap().state;
    }

    let all: Vec<_> = definition.steps().collect();
    let completed: Vec<_> = state.completed().iter().copied().collect();
    assert_eq!(completed, all);
}

#[test]
fn invalid_next_leaves_step_and_staging_untouched() {
    let mut shell = WizardShell::new().unwrap();
    fill(&mut shell, &valid_raw(RegistrationStep::SchoolDetails));
    shell.go_next().unwrap();
    shell.set_field("governance_type", "academy").unwrap();
    let before = shell.state().unwrap().clone();

    let outcome = shell.go_next().unwrap();

    let report = match outcome {
        Outcome::Invalid(report) => report,
        other => panic!("expected validation failure, got {other:?}"),
    };
    assert!(report.message_for("school_pupils_size").is_some());
    let after = shell.state().unwrap();
    assert_eq!(after.current(), RegistrationStep::SchoolProfile);
    assert_eq!(after.staging(), before.staging());
    assert_eq!(after, &before);
}

#[test]
fn previous_then_next_reproduces_the_same_payload() {
    let mut shell = WizardShell::new().unwrap();
    fill(&mut shell, &valid_raw(RegistrationStep::SchoolDetails));
    shell.go_next().unwrap();
    fill(&mut shell, &valid_raw(RegistrationStep::SchoolProfile));
    shell.go_next().unwrap();
    let staged = shell
        .state()
        .unwrap()
        .staging()
        .payload(RegistrationStep::SchoolProfile)
        .cloned()
        .unwrap();

    shell.go_previous().unwrap();
    let state = shell.state().unwrap();
    assert_eq!(state.current(), RegistrationStep::SchoolProfile);
    assert_eq!(state.fields(), &valid_raw(RegistrationStep::SchoolProfile));
    assert!(!state.is_complete(RegistrationStep::Contacts));

    shell.go_next().unwrap();
    let restaged = shell
        .state()
        .unwrap()
        .staging()
        .payload(RegistrationStep::SchoolProfile)
        .cloned()
        .unwrap();
    assert_eq!(restaged, staged);
}

#[test]
fn previous_never_alters_completion_or_payloads() {
    let mut shell = WizardShell::new().unwrap();
    fill(&mut shell, &valid_raw(RegistrationStep::SchoolDetails));
    shell.go_next().unwrap();
    let before = shell.state().unwrap().clone();

    shell.set_field("governance_type", "independent").unwrap();
    shell.go_previous().unwrap();

    let after = shell.state().unwrap();
    assert_eq!(after.completed(), before.completed());
    assert_eq!(after.staging(), before.staging());
    assert_eq!(after.fields(), &valid_raw(RegistrationStep::SchoolDetails));
}

#[test]
fn goto_last_from_first_step_reports_missing_steps() {
    let mut shell = WizardShell::new().unwrap();
    fill(&mut shell, &valid_raw(RegistrationStep::SchoolDetails));
    let err = shell.go_to("energy_supply").unwrap_err();
    assert_eq!(
        err,
        WizardError::IncompleteSteps {
            target: "energy_supply".into(),
            missing: vec!["school_profile".into(), "contacts".into()],
        }
    );
    assert_eq!(
        shell.state().unwrap().current(),
        RegistrationStep::SchoolDetails
    );
}

#[test]
fn backward_goto_is_unconditional_and_rehydrates() {
    let mut shell = shell_on_last_step();
    let outcome = shell.go_to("1").unwrap();
    assert_eq!(
        outcome,
        Outcome::Moved {
            from: RegistrationStep::EnergySupply,
            to: RegistrationStep::SchoolDetails
        }
    );
    assert_eq!(
        shell.state().unwrap().fields().text("school_name"),
        Some("Oak Primary")
    );
}

#[test]
fn union_payload_carries_known_literals() {
    let mut shell = shell_on_last_step();
    let Outcome::ReadyToSubmit(request) = shell.dispatch(WizardEvent::BeginSubmit).unwrap() else {
        panic!("expected request");
    };

    assert_eq!(request["school_name"], json!("Oak Primary"));
    assert_eq!(request["governance_type"], json!("academy"));
    assert_eq!(request["school_pupils_size"], json!("between_100_and_199"));
    assert_eq!(request["address"]["post_code"], json!("BA1 1AA"));
    assert_eq!(request["utilities_manager"], Value::Null);
    assert_eq!(request["annual_consumption"], json!(1_200_000));

    let typed: RegistrationRequest =
        serde_json::from_value(Value::Object(request)).expect("typed request");
    assert_eq!(typed.primary_contact.first_name, "Ada");
}

#[tokio::test]
async fn submit_hands_the_request_to_the_collaborator() {
    let mut shell = shell_on_last_step();
    let mut submitter = MockRegistrationSubmitter::new();
    submitter
        .expect_submit_registration()
        .withf(|request| {
            request.school_name == "Oak Primary"
                && request.address.post_code == "BA1 1AA"
                && request.annual_consumption == Some(1_200_000)
        })
        .times(1)
        .returning(|_| Ok(receipt()));

    let outcome = shell.submit(&submitter).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Submitted(receipt()));
    let state = shell.state().unwrap();
    assert!(state.staging().is_empty());
    assert_eq!(shell.go_previous().unwrap_err(), WizardError::AlreadySubmitted);
}

#[tokio::test]
async fn failed_submission_keeps_staging_for_retry() {
    let mut shell = shell_on_last_step();
    let mut failing = MockRegistrationSubmitter::new();
    failing
        .expect_submit_registration()
        .times(1)
        .returning(|_| Err(PortError::Unavailable("gateway timeout".into())));

    let err = shell.submit(&failing).await.unwrap_err();
    assert!(matches!(err, WizardError::Submission(PortError::Unavailable(_))));
    let state = shell.state().unwrap();
    assert_eq!(state.current(), RegistrationStep::EnergySupply);
    assert_eq!(state.staging().staged_steps().count(), 4);
    assert!(state.last_error().unwrap().contains("gateway timeout"));

    let mut working = MockRegistrationSubmitter::new();
    working
        .expect_submit_registration()
        .times(1)
        .returning(|_| Ok(receipt()));
    assert!(matches!(
        shell.submit(&working).await.unwrap(),
        SubmitOutcome::Submitted(_)
    ));
}

#[tokio::test]
async fn invalid_last_step_is_reported_without_calling_submitter() {
    let mut shell = shell_on_last_step();
    shell.set_field("annual_consumption", "lots").unwrap();
    let mut submitter = MockRegistrationSubmitter::new();
    submitter.expect_submit_registration().times(0);

    let outcome = shell.submit(&submitter).await.unwrap();
    let SubmitOutcome::Invalid(report) = outcome else {
        panic!("expected validation report");
    };
    assert!(report.message_for("annual_consumption").is_some());
    assert!(!shell
        .state()
        .unwrap()
        .is_complete(RegistrationStep::EnergySupply));
}

struct NeverResponds;

#[async_trait]
impl RegistrationSubmitter for NeverResponds {
    async fn submit_registration(
        &self,
        _request: &RegistrationRequest,
    ) -> Result<SubmissionReceipt, PortError> {
        future::pending().await
    }
}

#[async_trait]
impl AlertUpdater for NeverResponds {
    async fn update_alert(&self, _update: &AlertUpdate) -> Result<(), PortError> {
        future::pending().await
    }
}

#[tokio::test]
async fn aborted_submission_leaves_wizard_retryable() {
    let mut shell = shell_on_last_step();
    shell.abort_handle().cancel();

    let err = shell.submit(&NeverResponds).await.unwrap_err();

    assert_eq!(err, WizardError::Aborted);
    let state = shell.state().unwrap();
    assert_eq!(state.staging().staged_steps().count(), 4);
    assert!(!shell.abort_handle().is_cancelled());
}

fn gas_alert(energy_limit: f64) -> Alert {
    Alert {
        id: 5,
        alert_type: AlertType::GasConsumptionLevel,
        location_id: None,
        meter_id: None,
        limit_condition: None,
        energy_limit: Some(energy_limit),
        limit_duration: None,
        limit_period_start: None,
        limit_period_end: None,
        percentage_limit: None,
    }
}

fn start_alert_five(register: &mut AlertDraftRegister) {
    register
        .dispatch(DraftAction::StartEdit {
            id: 5,
            snapshot: AlertDraft {
                alert_type: Some(AlertType::GasConsumptionLevel),
                energy_limit: Some(10.0),
                ..AlertDraft::default()
            },
        })
        .unwrap();
    register
        .edit_field(5, AlertField::parse("energyLimit", "15").unwrap())
        .unwrap();
}

#[tokio::test]
async fn commit_sends_edited_value_and_drops_draft() {
    let mut register = AlertDraftRegister::new();
    start_alert_five(&mut register);

    let mut updater = MockAlertUpdater::new();
    updater
        .expect_update_alert()
        .withf(|update| {
            update.alert_id == 5
                && update.alert_type == AlertType::GasConsumptionLevel
                && update.energy_limit == Some(15.0)
                && update.meter_id.is_none()
        })
        .times(1)
        .returning(|_| Ok(()));
    let mut directory = MockAlertDirectory::new();
    directory
        .expect_list_alerts()
        .times(1)
        .returning(|| Ok(vec![gas_alert(15.0)]));

    let alerts = register
        .commit_edit(5, &updater, &directory, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(alerts, vec![gas_alert(15.0)]);
    assert!(register.draft(5).is_none());
}

#[tokio::test]
async fn cancel_removes_draft_without_calling_updater() {
    let mut register = AlertDraftRegister::new();
    start_alert_five(&mut register);
    let mut updater = MockAlertUpdater::new();
    updater.expect_update_alert().times(0);

    register.cancel_edit(5).unwrap();

    assert!(register.draft(5).is_none());
    assert!(matches!(
        register
            .commit_edit(5, &updater, &MockAlertDirectory::new(), &CancellationToken::new())
            .await,
        Err(DraftError::PreconditionViolation { id: 5, .. })
    ));
}

#[tokio::test]
async fn failed_update_keeps_draft_and_skips_refetch() {
    let mut register = AlertDraftRegister::new();
    start_alert_five(&mut register);
    let before = register.draft(5).cloned();

    let mut updater = MockAlertUpdater::new();
    updater
        .expect_update_alert()
        .times(1)
        .returning(|_| Err(PortError::Rejected("limit too high".into())));
    let mut directory = MockAlertDirectory::new();
    directory.expect_list_alerts().times(0);

    let err = register
        .commit_edit(5, &updater, &directory, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, DraftError::Update(PortError::Rejected("limit too high".into())));
    assert_eq!(register.draft(5).cloned(), before);
}

#[tokio::test]
async fn aborted_commit_keeps_draft() {
    let mut register = AlertDraftRegister::new();
    start_alert_five(&mut register);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = register
        .commit_edit(5, &NeverResponds, &MockAlertDirectory::new(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, DraftError::Aborted(5));
    assert_eq!(register.draft(5).unwrap().energy_limit, Some(15.0));
}
