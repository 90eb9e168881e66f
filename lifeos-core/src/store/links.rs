//! Link-list bookkeeping shared by the entity operations.

use super::{find_mut, Slot, State};
use crate::error::Result;
use crate::types::{Case, Contact, ContactInteraction, Project, Record, Task, WorkSession};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};

/// Accessor for a record's link list.
pub(super) type Links<T> = fn(&mut T) -> &mut Vec<String>;

/// Accessor for a record's optional single reference.
pub(super) type Reference<T> = fn(&mut T) -> &mut Option<String>;

pub(super) fn case_contacts(case: &mut Case) -> &mut Vec<String> {
    &mut case.contact_ids
}

pub(super) fn case_tasks(case: &mut Case) -> &mut Vec<String> {
    &mut case.task_ids
}

pub(super) fn contact_cases(contact: &mut Contact) -> &mut Vec<String> {
    &mut contact.case_ids
}

pub(super) fn task_cases(task: &mut Task) -> &mut Vec<String> {
    &mut task.case_ids
}

pub(super) fn task_projects(task: &mut Task) -> &mut Vec<String> {
    &mut task.project_ids
}

pub(super) fn session_case(session: &mut WorkSession) -> &mut Option<String> {
    &mut session.case_id
}

pub(super) fn session_task(session: &mut WorkSession) -> &mut Option<String> {
    &mut session.task_id
}

pub(super) fn interaction_case(interaction: &mut ContactInteraction) -> &mut Option<String> {
    &mut interaction.case_id
}

pub(super) fn project_goal(project: &mut Project) -> &mut Option<String> {
    &mut project.goal_id
}

/// Drop duplicate ids, keeping first occurrences in order.
pub(super) fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Ids only in `old` and ids only in `new`.
pub(super) fn diff_ids(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let removed = old.iter().filter(|id| !new.contains(id)).cloned().collect();
    let added = new.iter().filter(|id| !old.contains(id)).cloned().collect();
    (removed, added)
}

/// Add `id` unless already present. Returns true if the list changed.
pub(super) fn add_id(ids: &mut Vec<String>, id: &str) -> bool {
    if ids.iter().any(|existing| existing == id) {
        return false;
    }
    ids.push(id.to_string());
    true
}

/// Remove every occurrence of `id`. Returns true if the list changed.
pub(super) fn remove_id(ids: &mut Vec<String>, id: &str) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}

/// Mirror a change to `owner_id`'s link list onto the counterparts.
///
/// Every id in `added` must exist. Ids in `removed` that no longer exist are
/// skipped. Counterparts whose list changes get `updated_at = now`. Returns
/// true if any counterpart changed.
pub(super) fn sync_backrefs<T: Record>(
    items: &mut [T],
    links: Links<T>,
    owner_id: &str,
    removed: &[String],
    added: &[String],
    now: DateTime<Utc>,
) -> Result<bool> {
    let mut changed = false;

    for id in removed {
        if let Some(item) = items.iter_mut().find(|item| item.id() == id) {
            if remove_id(links(item), owner_id) {
                item.touch(now);
                changed = true;
            }
        }
    }

    for id in added {
        let item = find_mut(items, id)?;
        if add_id(links(item), owner_id) {
            item.touch(now);
            changed = true;
        }
    }

    Ok(changed)
}

/// Remove `id` from the link list of every record. Returns true if any
/// record changed.
pub(super) fn strip_everywhere<T: Record>(
    items: &mut [T],
    links: Links<T>,
    id: &str,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;
    for item in items.iter_mut() {
        if remove_id(links(item), id) {
            item.touch(now);
            changed = true;
        }
    }
    changed
}

/// Clear an optional reference equal to `id` on every record. Returns true
/// if any record changed.
pub(super) fn detach_everywhere<T: Record>(
    items: &mut [T],
    field: Reference<T>,
    id: &str,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;
    for item in items.iter_mut() {
        let slot = field(item);
        if slot.as_deref() == Some(id) {
            *slot = None;
            item.touch(now);
            changed = true;
        }
    }
    changed
}

/// Drop link ids that are not in `known`. Returns true if any record changed.
fn retain_known<T: Record>(
    items: &mut [T],
    links: Links<T>,
    known: &HashSet<String>,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;
    for item in items.iter_mut() {
        let list = links(item);
        let before = list.len();
        list.retain(|id| known.contains(id));
        if list.len() != before {
            item.touch(now);
            changed = true;
        }
    }
    changed
}

/// Clear optional references that are not in `known`. Returns true if any
/// record changed.
fn clear_unknown<T: Record>(
    items: &mut [T],
    field: Reference<T>,
    known: &HashSet<String>,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;
    for item in items.iter_mut() {
        let slot = field(item);
        if slot.as_ref().is_some_and(|id| !known.contains(id)) {
            *slot = None;
            item.touch(now);
            changed = true;
        }
    }
    changed
}

fn ids_of<T: Record>(items: &[T]) -> HashSet<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

/// Remove every reference to a record that is not in `state`.
///
/// Interactions whose contact is missing are deleted with it. Returns the
/// slots that changed.
pub(super) fn drop_dangling(state: &mut State, now: DateTime<Utc>) -> BTreeSet<Slot> {
    let cases = ids_of(&state.cases);
    let contacts = ids_of(&state.contacts);
    let tasks = ids_of(&state.tasks);
    let projects = ids_of(&state.projects);
    let goals = ids_of(&state.goals);

    let mut changed = BTreeSet::new();
    let mut mark = |hit: bool, slot: Slot| {
        if hit {
            changed.insert(slot);
        }
    };

    mark(retain_known(&mut state.cases, case_contacts, &contacts, now), Slot::Cases);
    mark(retain_known(&mut state.cases, case_tasks, &tasks, now), Slot::Cases);
    mark(retain_known(&mut state.contacts, contact_cases, &cases, now), Slot::Contacts);
    mark(retain_known(&mut state.tasks, task_cases, &cases, now), Slot::Tasks);
    mark(retain_known(&mut state.tasks, task_projects, &projects, now), Slot::Tasks);
    mark(clear_unknown(&mut state.projects, project_goal, &goals, now), Slot::Projects);
    mark(clear_unknown(&mut state.sessions, session_case, &cases, now), Slot::Sessions);
    mark(clear_unknown(&mut state.sessions, session_task, &tasks, now), Slot::Sessions);
    mark(
        clear_unknown(&mut state.interactions, interaction_case, &cases, now),
        Slot::ContactInteractions,
    );

    let before = state.interactions.len();
    state
        .interactions
        .retain(|interaction| contacts.contains(&interaction.contact_id));
    mark(state.interactions.len() != before, Slot::ContactInteractions);

    changed
}
