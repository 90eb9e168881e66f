//! Consistency checks over a whole [`State`].

use super::State;
use crate::types::{EntityKind, Record};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A broken link found by [`Store::check_integrity`](super::Store::check_integrity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// `from` lists `to`, but `to` does not list `from` back
    MissingBackReference {
        from: EntityKind,
        from_id: String,
        to: EntityKind,
        to_id: String,
    },
    /// A reference names a record that does not exist
    DanglingReference {
        from: EntityKind,
        from_id: String,
        field: &'static str,
        missing_id: String,
    },
    /// The same id appears twice in one link list
    DuplicateLink {
        kind: EntityKind,
        id: String,
        field: &'static str,
        linked_id: String,
    },
    /// Two records in one collection share an id
    DuplicateId { kind: EntityKind, id: String },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::MissingBackReference {
                from,
                from_id,
                to,
                to_id,
            } => write!(
                f,
                "{from} {from_id} links {to} {to_id}, which does not link back"
            ),
            IntegrityViolation::DanglingReference {
                from,
                from_id,
                field,
                missing_id,
            } => write!(f, "{from} {from_id}.{field} names missing record {missing_id}"),
            IntegrityViolation::DuplicateLink {
                kind,
                id,
                field,
                linked_id,
            } => write!(f, "{kind} {id}.{field} lists {linked_id} more than once"),
            IntegrityViolation::DuplicateId { kind, id } => {
                write!(f, "{kind} id {id} is used by more than one record")
            }
        }
    }
}

const NO_LINKS: &[String] = &[];

/// Index of one collection: id -> that record's link list.
struct LinkIndex<'a> {
    kind: EntityKind,
    links: HashMap<&'a str, &'a [String]>,
}

impl<'a> LinkIndex<'a> {
    fn build(
        kind: EntityKind,
        entries: impl Iterator<Item = (&'a str, &'a [String])>,
        out: &mut Vec<IntegrityViolation>,
    ) -> Self {
        let mut links = HashMap::new();
        for (id, linked) in entries {
            if links.insert(id, linked).is_some() {
                out.push(IntegrityViolation::DuplicateId {
                    kind,
                    id: id.to_string(),
                });
            }
        }
        Self { kind, links }
    }

    /// Index records that carry no link list
    fn ids<T: Record>(items: &'a [T], out: &mut Vec<IntegrityViolation>) -> Self {
        Self::build(T::KIND, items.iter().map(|item| (item.id(), NO_LINKS)), out)
    }

    fn contains(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }
}

/// Check both directions of one two-sided relation.
fn check_symmetric(
    left: &LinkIndex<'_>,
    left_field: &'static str,
    right: &LinkIndex<'_>,
    right_field: &'static str,
    out: &mut Vec<IntegrityViolation>,
) {
    for (side, field, other) in [(left, left_field, right), (right, right_field, left)] {
        for (id, linked) in &side.links {
            let mut seen = HashSet::new();
            for linked_id in linked.iter() {
                if !seen.insert(linked_id.as_str()) {
                    out.push(IntegrityViolation::DuplicateLink {
                        kind: side.kind,
                        id: id.to_string(),
                        field,
                        linked_id: linked_id.clone(),
                    });
                    continue;
                }
                match other.links.get(linked_id.as_str()) {
                    None => out.push(IntegrityViolation::DanglingReference {
                        from: side.kind,
                        from_id: id.to_string(),
                        field,
                        missing_id: linked_id.clone(),
                    }),
                    Some(back) if !back.iter().any(|b| b == id) => {
                        out.push(IntegrityViolation::MissingBackReference {
                            from: side.kind,
                            from_id: id.to_string(),
                            to: other.kind,
                            to_id: linked_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

fn dangling(
    out: &mut Vec<IntegrityViolation>,
    from: EntityKind,
    from_id: &str,
    field: &'static str,
    target: &LinkIndex<'_>,
    id: Option<&str>,
) {
    if let Some(id) = id {
        if !target.contains(id) {
            out.push(IntegrityViolation::DanglingReference {
                from,
                from_id: from_id.to_string(),
                field,
                missing_id: id.to_string(),
            });
        }
    }
}

/// Every violation in `state`; empty when all links agree.
pub(super) fn check(state: &State) -> Vec<IntegrityViolation> {
    let mut out = Vec::new();

    let cases_by_contact = LinkIndex::build(
        EntityKind::Case,
        state
            .cases
            .iter()
            .map(|c| (c.id.as_str(), c.contact_ids.as_slice())),
        &mut out,
    );
    // Same records as above; duplicates are already reported
    let cases_by_task = LinkIndex::build(
        EntityKind::Case,
        state.cases.iter().map(|c| (c.id.as_str(), c.task_ids.as_slice())),
        &mut Vec::new(),
    );
    let contacts = LinkIndex::build(
        EntityKind::Contact,
        state
            .contacts
            .iter()
            .map(|k| (k.id.as_str(), k.case_ids.as_slice())),
        &mut out,
    );
    let tasks = LinkIndex::build(
        EntityKind::Task,
        state.tasks.iter().map(|t| (t.id.as_str(), t.case_ids.as_slice())),
        &mut out,
    );
    let projects = LinkIndex::ids(&state.projects, &mut out);
    let goals = LinkIndex::ids(&state.goals, &mut out);
    LinkIndex::ids(&state.sessions, &mut out);
    LinkIndex::ids(&state.interactions, &mut out);

    check_symmetric(&cases_by_contact, "contact_ids", &contacts, "case_ids", &mut out);
    check_symmetric(&cases_by_task, "task_ids", &tasks, "case_ids", &mut out);

    for task in &state.tasks {
        for project_id in &task.project_ids {
            dangling(
                &mut out,
                EntityKind::Task,
                &task.id,
                "project_ids",
                &projects,
                Some(project_id.as_str()),
            );
        }
    }
    for project in &state.projects {
        dangling(
            &mut out,
            EntityKind::Project,
            &project.id,
            "goal_id",
            &goals,
            project.goal_id.as_deref(),
        );
    }
    for session in &state.sessions {
        let from = EntityKind::WorkSession;
        let case_id = session.case_id.as_deref();
        dangling(&mut out, from, &session.id, "case_id", &cases_by_contact, case_id);
        let task_id = session.task_id.as_deref();
        dangling(&mut out, from, &session.id, "task_id", &tasks, task_id);
    }
    for interaction in &state.interactions {
        let from = EntityKind::ContactInteraction;
        let contact_id = Some(interaction.contact_id.as_str());
        dangling(&mut out, from, &interaction.id, "contact_id", &contacts, contact_id);
        let case_id = interaction.case_id.as_deref();
        dangling(&mut out, from, &interaction.id, "case_id", &cases_by_contact, case_id);
    }

    out
}
