//! Work sessions and contact interactions.

use super::{find, find_mut, new_id, remove, require_opt, Slot, Store};
use crate::backend::SlotStore;
use crate::error::Result;
use crate::types::*;

impl<B: SlotStore> Store<B> {
    // ============================================
    // WorkSession operations
    // ============================================

    pub fn create_session(&mut self, input: WorkSessionInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            require_opt(&txn.state.cases, input.case_id.as_deref())?;
            require_opt(&txn.state.tasks, input.task_id.as_deref())?;

            let id = new_id();
            txn.state.sessions.insert(
                0,
                WorkSession {
                    id: id.clone(),
                    case_id: input.case_id,
                    task_id: input.task_id,
                    started_at: input.started_at,
                    ended_at: input.ended_at,
                    duration_minutes: input.duration_minutes,
                    billable: input.billable,
                    notes: input.notes,
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::Sessions);

            tracing::debug!(session_id = %id, "Recorded work session");
            Ok(id)
        })
    }

    pub fn update_session(&mut self, id: &str, patch: WorkSessionPatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            if let Some(case_id) = &patch.case_id {
                require_opt(&txn.state.cases, case_id.as_deref())?;
            }
            if let Some(task_id) = &patch.task_id {
                require_opt(&txn.state.tasks, task_id.as_deref())?;
            }

            let session = find_mut(&mut txn.state.sessions, id)?;
            if let Some(case_id) = patch.case_id {
                session.case_id = case_id;
            }
            if let Some(task_id) = patch.task_id {
                session.task_id = task_id;
            }
            if let Some(started_at) = patch.started_at {
                session.started_at = started_at;
            }
            if let Some(ended_at) = patch.ended_at {
                session.ended_at = ended_at;
            }
            if let Some(duration_minutes) = patch.duration_minutes {
                session.duration_minutes = duration_minutes;
            }
            if let Some(billable) = patch.billable {
                session.billable = billable;
            }
            if let Some(notes) = patch.notes {
                session.notes = notes;
            }
            session.touch(now);
            txn.touch(Slot::Sessions);
            Ok(())
        })
    }

    pub fn delete_session(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            remove(&mut txn.state.sessions, id)?;
            txn.touch(Slot::Sessions);
            Ok(())
        })
    }

    pub fn session(&self, id: &str) -> Result<&WorkSession> {
        find(&self.state.sessions, id)
    }

    pub fn sessions(&self) -> &[WorkSession] {
        &self.state.sessions
    }

    /// Work sessions recorded against a case
    pub fn sessions_for_case(&self, case_id: &str) -> Result<Vec<&WorkSession>> {
        self.case(case_id)?;
        Ok(self
            .state
            .sessions
            .iter()
            .filter(|session| session.case_id.as_deref() == Some(case_id))
            .collect())
    }

    /// Total billable minutes recorded against a case
    pub fn billable_minutes_for_case(&self, case_id: &str) -> Result<u64> {
        Ok(self
            .sessions_for_case(case_id)?
            .into_iter()
            .filter(|session| session.billable)
            .map(|session| u64::from(session.minutes()))
            .sum())
    }

    // ============================================
    // ContactInteraction operations
    // ============================================

    pub fn create_interaction(&mut self, input: ContactInteractionInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            find(&txn.state.contacts, &input.contact_id)?;
            require_opt(&txn.state.cases, input.case_id.as_deref())?;

            let id = new_id();
            txn.state.interactions.insert(
                0,
                ContactInteraction {
                    id: id.clone(),
                    contact_id: input.contact_id,
                    case_id: input.case_id,
                    kind: input.kind,
                    occurred_at: input.occurred_at,
                    summary: input.summary,
                    follow_up_date: input.follow_up_date,
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::ContactInteractions);

            tracing::debug!(interaction_id = %id, "Logged contact interaction");
            Ok(id)
        })
    }

    pub fn update_interaction(&mut self, id: &str, patch: ContactInteractionPatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            if let Some(case_id) = &patch.case_id {
                require_opt(&txn.state.cases, case_id.as_deref())?;
            }

            let interaction = find_mut(&mut txn.state.interactions, id)?;
            if let Some(case_id) = patch.case_id {
                interaction.case_id = case_id;
            }
            if let Some(kind) = patch.kind {
                interaction.kind = kind;
            }
            if let Some(occurred_at) = patch.occurred_at {
                interaction.occurred_at = occurred_at;
            }
            if let Some(summary) = patch.summary {
                interaction.summary = summary;
            }
            if let Some(follow_up_date) = patch.follow_up_date {
                interaction.follow_up_date = follow_up_date;
            }
            interaction.touch(now);
            txn.touch(Slot::ContactInteractions);
            Ok(())
        })
    }

    pub fn delete_interaction(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            remove(&mut txn.state.interactions, id)?;
            txn.touch(Slot::ContactInteractions);
            Ok(())
        })
    }

    pub fn interaction(&self, id: &str) -> Result<&ContactInteraction> {
        find(&self.state.interactions, id)
    }

    pub fn interactions(&self) -> &[ContactInteraction] {
        &self.state.interactions
    }

    /// Interactions with a contact, most recent first
    pub fn interactions_for_contact(&self, contact_id: &str) -> Result<Vec<&ContactInteraction>> {
        self.contact(contact_id)?;
        let mut out: Vec<_> = self
            .state
            .interactions
            .iter()
            .filter(|interaction| interaction.contact_id == contact_id)
            .collect();
        out.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(out)
    }
}
