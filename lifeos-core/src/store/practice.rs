//! Cases, Contacts, and Tasks: the records that carry two-sided links.

use super::links::{self, dedup_ids, diff_ids, strip_everywhere, sync_backrefs};
use super::{find, find_mut, new_id, remove, require_all, Slot, Store};
use crate::backend::SlotStore;
use crate::error::Result;
use crate::types::*;

impl<B: SlotStore> Store<B> {
    // ============================================
    // Case operations
    // ============================================

    /// Create a case and link it to the given contacts and tasks.
    ///
    /// Returns the new case id.
    pub fn create_case(&mut self, input: CaseInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            let id = new_id();
            let contact_ids = dedup_ids(input.contact_ids);
            let task_ids = dedup_ids(input.task_ids);

            let closed_date = match (input.status, input.closed_date) {
                (CaseStatus::Closed, None) => Some(now.date_naive()),
                (_, closed) => closed,
            };

            txn.state.cases.insert(
                0,
                Case {
                    id: id.clone(),
                    title: input.title,
                    client_name: input.client_name,
                    description: input.description,
                    case_type: input.case_type,
                    status: input.status,
                    priority: input.priority,
                    opened_date: input.opened_date,
                    due_date: input.due_date,
                    closed_date,
                    estimated_hours: input.estimated_hours,
                    actual_hours: input.actual_hours,
                    billing_rate: input.billing_rate,
                    contact_ids: contact_ids.clone(),
                    task_ids: task_ids.clone(),
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::Cases);

            if sync_backrefs(
                &mut txn.state.contacts,
                links::contact_cases,
                &id,
                &[],
                &contact_ids,
                now,
            )? {
                txn.touch(Slot::Contacts);
            }
            if sync_backrefs(&mut txn.state.tasks, links::task_cases, &id, &[], &task_ids, now)? {
                txn.touch(Slot::Tasks);
            }

            tracing::debug!(
                case_id = %id,
                contacts = contact_ids.len(),
                tasks = task_ids.len(),
                "Created case"
            );
            Ok(id)
        })
    }

    /// Apply a partial update to a case.
    ///
    /// Changing `contact_ids` or `task_ids` adds and removes the matching
    /// back-references on the affected contacts and tasks.
    pub fn update_case(&mut self, id: &str, patch: CasePatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            let case = find_mut(&mut txn.state.cases, id)?;

            if let Some(title) = patch.title {
                case.title = title;
            }
            if let Some(client_name) = patch.client_name {
                case.client_name = client_name;
            }
            if let Some(description) = patch.description {
                case.description = description;
            }
            if let Some(case_type) = patch.case_type {
                case.case_type = case_type;
            }
            if let Some(priority) = patch.priority {
                case.priority = priority;
            }
            if let Some(opened_date) = patch.opened_date {
                case.opened_date = opened_date;
            }
            if let Some(due_date) = patch.due_date {
                case.due_date = due_date;
            }
            if let Some(estimated_hours) = patch.estimated_hours {
                case.estimated_hours = estimated_hours;
            }
            if let Some(actual_hours) = patch.actual_hours {
                case.actual_hours = actual_hours;
            }
            if let Some(billing_rate) = patch.billing_rate {
                case.billing_rate = billing_rate;
            }
            if let Some(status) = patch.status {
                let was_closed = case.status == CaseStatus::Closed;
                case.status = status;
                if patch.closed_date.is_none() {
                    match (was_closed, status == CaseStatus::Closed) {
                        (false, true) if case.closed_date.is_none() => {
                            case.closed_date = Some(now.date_naive());
                        }
                        (true, false) => case.closed_date = None,
                        _ => {}
                    }
                }
            }
            if let Some(closed_date) = patch.closed_date {
                case.closed_date = closed_date;
            }

            let contact_change = patch.contact_ids.map(|new| {
                let new = dedup_ids(new);
                let change = diff_ids(&case.contact_ids, &new);
                case.contact_ids = new;
                change
            });
            let task_change = patch.task_ids.map(|new| {
                let new = dedup_ids(new);
                let change = diff_ids(&case.task_ids, &new);
                case.task_ids = new;
                change
            });

            case.touch(now);
            txn.touch(Slot::Cases);

            if let Some((removed, added)) = contact_change {
                if sync_backrefs(
                    &mut txn.state.contacts,
                    links::contact_cases,
                    id,
                    &removed,
                    &added,
                    now,
                )? {
                    txn.touch(Slot::Contacts);
                }
            }
            if let Some((removed, added)) = task_change {
                if sync_backrefs(
                    &mut txn.state.tasks,
                    links::task_cases,
                    id,
                    &removed,
                    &added,
                    now,
                )? {
                    txn.touch(Slot::Tasks);
                }
            }

            tracing::debug!(case_id = %id, "Updated case");
            Ok(())
        })
    }

    /// Delete a case and remove every reference to it.
    pub fn delete_case(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            remove(&mut txn.state.cases, id)?;
            txn.touch(Slot::Cases);

            if strip_everywhere(&mut txn.state.contacts, links::contact_cases, id, now) {
                txn.touch(Slot::Contacts);
            }
            if strip_everywhere(&mut txn.state.tasks, links::task_cases, id, now) {
                txn.touch(Slot::Tasks);
            }
            if links::detach_everywhere(&mut txn.state.sessions, links::session_case, id, now) {
                txn.touch(Slot::Sessions);
            }
            if links::detach_everywhere(
                &mut txn.state.interactions,
                links::interaction_case,
                id,
                now,
            ) {
                txn.touch(Slot::ContactInteractions);
            }

            tracing::debug!(case_id = %id, "Deleted case");
            Ok(())
        })
    }

    pub fn case(&self, id: &str) -> Result<&Case> {
        find(&self.state.cases, id)
    }

    /// All cases, most recently created first
    pub fn cases(&self) -> &[Case] {
        &self.state.cases
    }

    // ============================================
    // Contact operations
    // ============================================

    /// Create a contact and link it to the given cases.
    ///
    /// Returns the new contact id, so a caller editing a case can link the
    /// contact right away.
    pub fn create_contact(&mut self, input: ContactInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            let id = new_id();
            let case_ids = dedup_ids(input.case_ids);

            txn.state.contacts.insert(
                0,
                Contact {
                    id: id.clone(),
                    contact_type: input.contact_type,
                    first_name: input.first_name,
                    last_name: input.last_name,
                    organization: input.organization,
                    role: input.role,
                    email: input.email,
                    phone: input.phone,
                    address: input.address,
                    notes: input.notes,
                    case_ids: case_ids.clone(),
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::Contacts);

            if sync_backrefs(&mut txn.state.cases, links::case_contacts, &id, &[], &case_ids, now)? {
                txn.touch(Slot::Cases);
            }

            tracing::debug!(contact_id = %id, cases = case_ids.len(), "Created contact");
            Ok(id)
        })
    }

    pub fn update_contact(&mut self, id: &str, patch: ContactPatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            let contact = find_mut(&mut txn.state.contacts, id)?;

            if let Some(contact_type) = patch.contact_type {
                contact.contact_type = contact_type;
            }
            if let Some(first_name) = patch.first_name {
                contact.first_name = first_name;
            }
            if let Some(last_name) = patch.last_name {
                contact.last_name = last_name;
            }
            if let Some(organization) = patch.organization {
                contact.organization = organization;
            }
            if let Some(role) = patch.role {
                contact.role = role;
            }
            if let Some(email) = patch.email {
                contact.email = email;
            }
            if let Some(phone) = patch.phone {
                contact.phone = phone;
            }
            if let Some(address) = patch.address {
                contact.address = address;
            }
            if let Some(notes) = patch.notes {
                contact.notes = notes;
            }

            let case_change = patch.case_ids.map(|new| {
                let new = dedup_ids(new);
                let change = diff_ids(&contact.case_ids, &new);
                contact.case_ids = new;
                change
            });

            contact.touch(now);
            txn.touch(Slot::Contacts);

            if let Some((removed, added)) = case_change {
                if sync_backrefs(
                    &mut txn.state.cases,
                    links::case_contacts,
                    id,
                    &removed,
                    &added,
                    now,
                )? {
                    txn.touch(Slot::Cases);
                }
            }

            tracing::debug!(contact_id = %id, "Updated contact");
            Ok(())
        })
    }

    /// Delete a contact, unlink it from every case, and delete its
    /// interactions.
    pub fn delete_contact(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            remove(&mut txn.state.contacts, id)?;
            txn.touch(Slot::Contacts);

            if strip_everywhere(&mut txn.state.cases, links::case_contacts, id, now) {
                txn.touch(Slot::Cases);
            }

            let before = txn.state.interactions.len();
            txn.state.interactions.retain(|i| i.contact_id != id);
            let dropped = before - txn.state.interactions.len();
            if dropped > 0 {
                txn.touch(Slot::ContactInteractions);
            }

            tracing::debug!(contact_id = %id, interactions = dropped, "Deleted contact");
            Ok(())
        })
    }

    pub fn contact(&self, id: &str) -> Result<&Contact> {
        find(&self.state.contacts, id)
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.state.contacts
    }

    // ============================================
    // Task operations
    // ============================================

    /// Create a task linked to the given cases and projects.
    pub fn create_task(&mut self, input: TaskInput) -> Result<String> {
        self.mutate(|txn| {
            let now = txn.now;
            let id = new_id();
            let case_ids = dedup_ids(input.case_ids);
            let project_ids = dedup_ids(input.project_ids);
            require_all(&txn.state.projects, &project_ids)?;

            let completed_at = (input.status == TaskStatus::Done).then_some(now);

            txn.state.tasks.insert(
                0,
                Task {
                    id: id.clone(),
                    title: input.title,
                    description: input.description,
                    status: input.status,
                    priority: input.priority,
                    due_date: input.due_date,
                    scheduled_date: input.scheduled_date,
                    estimated_minutes: input.estimated_minutes,
                    completed_at,
                    case_ids: case_ids.clone(),
                    project_ids,
                    created_at: now,
                    updated_at: now,
                },
            );
            txn.touch(Slot::Tasks);

            if sync_backrefs(&mut txn.state.cases, links::case_tasks, &id, &[], &case_ids, now)? {
                txn.touch(Slot::Cases);
            }

            tracing::debug!(task_id = %id, cases = case_ids.len(), "Created task");
            Ok(id)
        })
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            let project_ids = patch.project_ids.map(dedup_ids);
            if let Some(project_ids) = &project_ids {
                require_all(&txn.state.projects, project_ids)?;
            }

            let task = find_mut(&mut txn.state.tasks, id)?;

            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(status) = patch.status {
                match (task.status == TaskStatus::Done, status == TaskStatus::Done) {
                    (false, true) => task.completed_at = Some(now),
                    (true, false) => task.completed_at = None,
                    _ => {}
                }
                task.status = status;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = due_date;
            }
            if let Some(scheduled_date) = patch.scheduled_date {
                task.scheduled_date = scheduled_date;
            }
            if let Some(estimated_minutes) = patch.estimated_minutes {
                task.estimated_minutes = estimated_minutes;
            }
            if let Some(project_ids) = project_ids {
                task.project_ids = project_ids;
            }

            let case_change = patch.case_ids.map(|new| {
                let new = dedup_ids(new);
                let change = diff_ids(&task.case_ids, &new);
                task.case_ids = new;
                change
            });

            task.touch(now);
            txn.touch(Slot::Tasks);

            if let Some((removed, added)) = case_change {
                if sync_backrefs(
                    &mut txn.state.cases,
                    links::case_tasks,
                    id,
                    &removed,
                    &added,
                    now,
                )? {
                    txn.touch(Slot::Cases);
                }
            }

            tracing::debug!(task_id = %id, "Updated task");
            Ok(())
        })
    }

    /// Delete a task, unlink it from every case, and detach its work
    /// sessions.
    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        self.mutate(|txn| {
            let now = txn.now;
            remove(&mut txn.state.tasks, id)?;
            txn.touch(Slot::Tasks);

            if strip_everywhere(&mut txn.state.cases, links::case_tasks, id, now) {
                txn.touch(Slot::Cases);
            }
            if links::detach_everywhere(&mut txn.state.sessions, links::session_task, id, now) {
                txn.touch(Slot::Sessions);
            }

            tracing::debug!(task_id = %id, "Deleted task");
            Ok(())
        })
    }

    pub fn task(&self, id: &str) -> Result<&Task> {
        find(&self.state.tasks, id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    // ============================================
    // Explicit links
    // ============================================

    /// Link a contact to a case. Linking twice is a no-op.
    pub fn link_contact(&mut self, case_id: &str, contact_id: &str) -> Result<()> {
        let mut contact_ids = self.case(case_id)?.contact_ids.clone();
        self.contact(contact_id)?;
        if !links::add_id(&mut contact_ids, contact_id) {
            return Ok(());
        }
        self.update_case(
            case_id,
            CasePatch {
                contact_ids: Some(contact_ids),
                ..Default::default()
            },
        )
    }

    pub fn unlink_contact(&mut self, case_id: &str, contact_id: &str) -> Result<()> {
        let mut contact_ids = self.case(case_id)?.contact_ids.clone();
        self.contact(contact_id)?;
        if !links::remove_id(&mut contact_ids, contact_id) {
            return Ok(());
        }
        self.update_case(
            case_id,
            CasePatch {
                contact_ids: Some(contact_ids),
                ..Default::default()
            },
        )
    }

    /// Link a task to a case. Linking twice is a no-op.
    pub fn link_task(&mut self, case_id: &str, task_id: &str) -> Result<()> {
        let mut task_ids = self.case(case_id)?.task_ids.clone();
        self.task(task_id)?;
        if !links::add_id(&mut task_ids, task_id) {
            return Ok(());
        }
        self.update_case(
            case_id,
            CasePatch {
                task_ids: Some(task_ids),
                ..Default::default()
            },
        )
    }

    pub fn unlink_task(&mut self, case_id: &str, task_id: &str) -> Result<()> {
        let mut task_ids = self.case(case_id)?.task_ids.clone();
        self.task(task_id)?;
        if !links::remove_id(&mut task_ids, task_id) {
            return Ok(());
        }
        self.update_case(
            case_id,
            CasePatch {
                task_ids: Some(task_ids),
                ..Default::default()
            },
        )
    }

    // ============================================
    // Relationship queries
    // ============================================

    /// Contacts linked to a case, in link order. Ids with no record are
    /// skipped.
    pub fn contacts_for_case(&self, case_id: &str) -> Result<Vec<&Contact>> {
        let case = self.case(case_id)?;
        Ok(case
            .contact_ids
            .iter()
            .filter_map(|id| find(&self.state.contacts, id).ok())
            .collect())
    }

    /// Tasks linked to a case, in link order. Ids with no record are skipped.
    pub fn tasks_for_case(&self, case_id: &str) -> Result<Vec<&Task>> {
        let case = self.case(case_id)?;
        Ok(case
            .task_ids
            .iter()
            .filter_map(|id| find(&self.state.tasks, id).ok())
            .collect())
    }

    /// Cases a contact is involved in, in link order. Ids with no record are
    /// skipped.
    pub fn cases_for_contact(&self, contact_id: &str) -> Result<Vec<&Case>> {
        let contact = self.contact(contact_id)?;
        Ok(contact
            .case_ids
            .iter()
            .filter_map(|id| find(&self.state.cases, id).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn store() -> Store<crate::backend::MemorySlots> {
        Store::in_memory()
    }

    #[test]
    fn test_create_contact_links_case() {
        let mut store = store();
        let case_id = store.create_case(CaseInput::new("A", "Client A")).unwrap();

        let mut input = ContactInput::new(ContactType::Client, "B", "Contact");
        input.case_ids = vec![case_id.clone()];
        let contact_id = store.create_contact(input).unwrap();

        assert_eq!(store.case(&case_id).unwrap().contact_ids, vec![contact_id.clone()]);

        store.delete_contact(&contact_id).unwrap();
        assert!(store.case(&case_id).unwrap().contact_ids.is_empty());
        assert!(store.check_integrity().is_empty());
    }

    #[test]
    fn test_create_with_unknown_link_changes_nothing() {
        let mut store = store();
        let mut input = ContactInput::new(ContactType::Judge, "Ann", "Ito");
        input.case_ids = vec!["missing".to_string()];

        let err = store.create_contact(input).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound { kind: EntityKind::Case, ref id } if id == "missing"
        ));
        assert!(store.contacts().is_empty());
    }

    #[test]
    fn test_new_records_go_to_head() {
        let mut store = store();
        let first = store.create_task(TaskInput::new("first")).unwrap();
        let second = store.create_task(TaskInput::new("second")).unwrap();
        assert_eq!(store.tasks()[0].id, second);
        assert_eq!(store.tasks()[1].id, first);
    }

    #[test]
    fn test_update_task_moves_case_link() {
        let mut store = store();
        let c1 = store.create_case(CaseInput::new("C1", "X")).unwrap();
        let c2 = store.create_case(CaseInput::new("C2", "Y")).unwrap();

        let mut input = TaskInput::new("T");
        input.case_ids = vec![c1.clone(), c2.clone()];
        let task = store.create_task(input).unwrap();

        store
            .update_task(
                &task,
                TaskPatch {
                    case_ids: Some(vec![c2.clone()]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!store.case(&c1).unwrap().task_ids.contains(&task));
        assert!(store.case(&c2).unwrap().task_ids.contains(&task));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let mut store = store();
        let err = store.update_case("nope", CasePatch::default()).unwrap_err();
        assert!(err.is_not_found());
        let err = store.delete_task("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_task_completion_timestamp() {
        let mut store = store();
        let task = store.create_task(TaskInput::new("File brief")).unwrap();
        assert!(store.task(&task).unwrap().completed_at.is_none());

        let done = TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        store.update_task(&task, done).unwrap();
        assert!(store.task(&task).unwrap().completed_at.is_some());

        let reopen = TaskPatch {
            status: Some(TaskStatus::NextAction),
            ..Default::default()
        };
        store.update_task(&task, reopen).unwrap();
        assert!(store.task(&task).unwrap().completed_at.is_none());
    }

    #[test]
    fn test_closing_case_stamps_closed_date() {
        let mut store = store();
        let case = store.create_case(CaseInput::new("A", "B")).unwrap();

        let close = CasePatch {
            status: Some(CaseStatus::Closed),
            ..Default::default()
        };
        store.update_case(&case, close).unwrap();
        assert!(store.case(&case).unwrap().closed_date.is_some());

        let reopen = CasePatch {
            status: Some(CaseStatus::Active),
            ..Default::default()
        };
        store.update_case(&case, reopen).unwrap();
        assert!(store.case(&case).unwrap().closed_date.is_none());
    }

    #[test]
    fn test_link_and_unlink_contact() {
        let mut store = store();
        let case = store.create_case(CaseInput::new("A", "B")).unwrap();
        let contact = store
            .create_contact(ContactInput::new(ContactType::Expert, "Dr", "Who"))
            .unwrap();

        store.link_contact(&case, &contact).unwrap();
        store.link_contact(&case, &contact).unwrap();
        assert_eq!(store.case(&case).unwrap().contact_ids, vec![contact.clone()]);
        assert_eq!(store.contact(&contact).unwrap().case_ids, vec![case.clone()]);
        assert_eq!(store.contacts_for_case(&case).unwrap().len(), 1);
        assert_eq!(store.cases_for_contact(&contact).unwrap()[0].id, case);

        store.unlink_contact(&case, &contact).unwrap();
        assert!(store.contact(&contact).unwrap().case_ids.is_empty());
        assert!(store.check_integrity().is_empty());
    }

    #[test]
    fn test_duplicate_links_collapse() {
        let mut store = store();
        let case = store.create_case(CaseInput::new("A", "B")).unwrap();
        let mut input = TaskInput::new("T");
        input.case_ids = vec![case.clone(), case.clone()];
        let task = store.create_task(input).unwrap();

        assert_eq!(store.task(&task).unwrap().case_ids, vec![case.clone()]);
        assert_eq!(store.case(&case).unwrap().task_ids, vec![task]);
    }

    #[test]
    fn test_relationship_queries_skip_missing_records() {
        let mut store = store();
        let case = store.create_case(CaseInput::new("A", "B")).unwrap();
        let mut input = TaskInput::new("T");
        input.case_ids = vec![case.clone()];
        let task = store.create_task(input).unwrap();

        store.state.cases[0].contact_ids.push("gone".to_string());
        store.state.cases[0].task_ids.insert(0, "gone".to_string());

        assert!(store.contacts_for_case(&case).unwrap().is_empty());
        let tasks = store.tasks_for_case(&case).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task);
        assert!(matches!(
            store.contacts_for_case("missing"),
            Err(Error::NotFound { .. })
        ));
    }
}
