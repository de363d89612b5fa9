//! Local edit state for alert applets, keyed by alert id.
//!
//! [`reduce_drafts`] is the pure transition over the draft map.
//! [`AlertDraftRegister`] owns a map, applies actions to it and runs the
//! save flow against the update and list collaborators.

use std::collections::BTreeMap;

use sems_domain::{Alert, AlertDraft, AlertField, AlertId, AlertUpdate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DraftError;
use crate::ports::{AlertDirectory, AlertUpdater};

pub type DraftMap = BTreeMap<AlertId, AlertDraft>;

#[derive(Debug, Clone, PartialEq)]
pub enum DraftAction {
    StartEdit { id: AlertId, snapshot: AlertDraft },
    EditField { id: AlertId, field: AlertField },
    CancelEdit { id: AlertId },
    /// Drops a draft after a successful save. Missing drafts are ignored.
    Discard { id: AlertId },
}

pub fn reduce_drafts(drafts: &DraftMap, action: DraftAction) -> Result<DraftMap, DraftError> {
    let mut next = drafts.clone();
    match action {
        DraftAction::StartEdit { id, snapshot } => {
            if next.contains_key(&id) {
                return Err(DraftError::AlreadyEditing(id));
            }
            next.insert(id, snapshot);
        }
        DraftAction::EditField { id, field } => {
            let draft = next
                .get_mut(&id)
                .ok_or_else(|| precondition_violation(id, "edit_field"))?;
            draft.apply(field);
        }
        DraftAction::CancelEdit { id } => {
            next.remove(&id)
                .ok_or_else(|| precondition_violation(id, "cancel_edit"))?;
        }
        DraftAction::Discard { id } => {
            next.remove(&id);
        }
    }
    Ok(next)
}

fn precondition_violation(id: AlertId, operation: &'static str) -> DraftError {
    error!(alert_id = id, operation, "alert draft operation without start_edit");
    DraftError::PreconditionViolation { id, operation }
}

/// Builds the update-alert arguments from a draft.
pub fn draft_to_update(id: AlertId, draft: &AlertDraft) -> Result<AlertUpdate, DraftError> {
    let alert_type = draft.alert_type.ok_or(DraftError::MissingField {
        id,
        field: "alert_type",
    })?;
    Ok(AlertUpdate {
        alert_id: id,
        alert_type,
        meter_id: draft.meter_id,
        location_id: draft.location_id,
        limit_condition: draft.limit_condition,
        energy_limit: draft.energy_limit,
        limit_duration: draft.limit_duration,
        limit_period_start: draft.limit_period_start,
        limit_period_end: draft.limit_period_end,
        percentage_limit: draft.percentage_limit,
    })
}

#[derive(Debug, Clone, Default)]
pub struct AlertDraftRegister {
    drafts: DraftMap,
}

impl AlertDraftRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: DraftAction) -> Result<(), DraftError> {
        self.drafts = reduce_drafts(&self.drafts, action)?;
        Ok(())
    }

    /// Opens a draft initialised from the alert's persisted fields.
    pub fn start_edit(&mut self, alert: &Alert) -> Result<(), DraftError> {
        self.dispatch(DraftAction::StartEdit {
            id: alert.id,
            snapshot: AlertDraft::from(alert),
        })?;
        debug!(alert_id = alert.id, "alert edit started");
        Ok(())
    }

    pub fn edit_field(&mut self, id: AlertId, field: AlertField) -> Result<(), DraftError> {
        self.dispatch(DraftAction::EditField { id, field })
    }

    /// Parses CLI text into a typed field and applies it.
    pub fn edit_field_text(&mut self, id: AlertId, name: &str, value: &str) -> Result<(), DraftError> {
        let field = AlertField::parse(name, value)?;
        self.edit_field(id, field)
    }

    pub fn cancel_edit(&mut self, id: AlertId) -> Result<(), DraftError> {
        self.dispatch(DraftAction::CancelEdit { id })?;
        debug!(alert_id = id, "alert edit cancelled");
        Ok(())
    }

    pub fn draft(&self, id: AlertId) -> Option<&AlertDraft> {
        self.drafts.get(&id)
    }

    pub fn is_editing(&self, id: AlertId) -> bool {
        self.drafts.contains_key(&id)
    }

    pub fn drafts(&self) -> &DraftMap {
        &self.drafts
    }

    /// Sends the draft to the update collaborator. On success the draft is
    /// dropped and the refreshed alert list is returned. On failure or abort
    /// the draft is left exactly as it was.
    pub async fn commit_edit(
        &mut self,
        id: AlertId,
        updater: &dyn AlertUpdater,
        directory: &dyn AlertDirectory,
        cancel: &CancellationToken,
    ) -> Result<Vec<Alert>, DraftError> {
        let draft = self
            .drafts
            .get(&id)
            .ok_or_else(|| precondition_violation(id, "commit_edit"))?;
        let update = draft_to_update(id, draft)?;

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(alert_id = id, "alert save aborted");
                return Err(DraftError::Aborted(id));
            }
            result = updater.update_alert(&update) => result,
        };
        if let Err(err) = result {
            warn!(alert_id = id, error = %err, "alert update failed; draft kept");
            return Err(DraftError::Update(err));
        }

        self.dispatch(DraftAction::Discard { id })?;
        info!(alert_id = id, "alert saved");

        tokio::select! {
            _ = cancel.cancelled() => Err(DraftError::Aborted(id)),
            alerts = directory.list_alerts() => alerts.map_err(|err| {
                warn!(error = %err, "alert list refresh failed");
                DraftError::Refetch(err)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sems_domain::{AlertType, LimitCondition};

    fn snapshot() -> AlertDraft {
        AlertDraft {
            alert_type: Some(AlertType::GasConsumptionLevel),
            energy_limit: Some(10.0),
            ..AlertDraft::default()
        }
    }

    #[test]
    fn reducer_does_not_touch_input_map() {
        let empty = DraftMap::new();
        let started = reduce_drafts(
            &empty,
            DraftAction::StartEdit {
                id: 5,
                snapshot: snapshot(),
            },
        )
        .unwrap();
        assert!(empty.is_empty());
        assert_eq!(started.get(&5), Some(&snapshot()));
    }

    #[test]
    fn edit_field_is_a_shallow_merge() {
        let mut register = AlertDraftRegister::new();
        register
            .dispatch(DraftAction::StartEdit {
                id: 5,
                snapshot: snapshot(),
            })
            .unwrap();
        register
            .edit_field(5, AlertField::LimitCondition(Some(LimitCondition::Below)))
            .unwrap();

        let draft = register.draft(5).unwrap();
        assert_eq!(draft.limit_condition, Some(LimitCondition::Below));
        assert_eq!(draft.energy_limit, Some(10.0));
        assert_eq!(draft.alert_type, Some(AlertType::GasConsumptionLevel));
    }

    #[test]
    fn edits_without_draft_are_precondition_violations() {
        let mut register = AlertDraftRegister::new();
        assert_eq!(
            register.edit_field(9, AlertField::EnergyLimit(Some(1.0))),
            Err(DraftError::PreconditionViolation {
                id: 9,
                operation: "edit_field"
            })
        );
        assert!(matches!(
            register.cancel_edit(9),
            Err(DraftError::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn second_start_edit_is_refused() {
        let mut register = AlertDraftRegister::new();
        let start = DraftAction::StartEdit {
            id: 5,
            snapshot: snapshot(),
        };
        register.dispatch(start.clone()).unwrap();
        register
            .edit_field(5, AlertField::EnergyLimit(Some(15.0)))
            .unwrap();
        assert_eq!(register.dispatch(start), Err(DraftError::AlreadyEditing(5)));
        assert_eq!(register.draft(5).unwrap().energy_limit, Some(15.0));
    }

    #[test]
    fn update_requires_alert_type() {
        let err = draft_to_update(3, &AlertDraft::default()).unwrap_err();
        assert_eq!(
            err,
            DraftError::MissingField {
                id: 3,
                field: "alert_type"
            }
        );
    }

    #[test]
    fn edit_field_text_reports_parse_errors() {
        let mut register = AlertDraftRegister::new();
        register
            .dispatch(DraftAction::StartEdit {
                id: 5,
                snapshot: snapshot(),
            })
            .unwrap();
        assert!(matches!(
            register.edit_field_text(5, "energyLimit", "loads"),
            Err(DraftError::InvalidField(_))
        ));
        register.edit_field_text(5, "energyLimit", "15").unwrap();
        assert_eq!(register.draft(5).unwrap().energy_limit, Some(15.0));
    }
}
