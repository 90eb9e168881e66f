//! Integration tests for the relational store
//!
//! These tests drive the public store API over in-memory slots and over a
//! SQLite database in a temporary directory, checking that Case↔Contact and
//! Case↔Task links stay consistent and that snapshots survive a reopen.

use lifeos_core::store::snapshot;
use lifeos_core::*;
use proptest::prelude::*;
use tempfile::TempDir;

fn open_memory(slots: &MemorySlots) -> Store<MemorySlots> {
    Store::open(slots.clone(), RecoveryPolicy::Strict).expect("store should open")
}

fn contact_input(first: &str, case_ids: Vec<String>) -> ContactInput {
    let mut input = ContactInput::new(ContactType::Client, first, "Example");
    input.case_ids = case_ids;
    input
}

fn task_input(title: &str, case_ids: Vec<String>) -> TaskInput {
    let mut input = TaskInput::new(title);
    input.case_ids = case_ids;
    input
}

/// Assert both directions of both two-sided relations by hand.
fn assert_symmetric<B: SlotStore>(store: &Store<B>) {
    for case in store.cases() {
        for contact in store.contacts() {
            assert_eq!(
                case.contact_ids.contains(&contact.id),
                contact.case_ids.contains(&case.id),
                "case {} / contact {} disagree",
                case.id,
                contact.id
            );
        }
        for task in store.tasks() {
            assert_eq!(
                case.task_ids.contains(&task.id),
                task.case_ids.contains(&case.id),
                "case {} / task {} disagree",
                case.id,
                task.id
            );
        }
    }
    let violations = store.check_integrity();
    assert!(violations.is_empty(), "violations: {violations:?}");
}

// ============================================
// Link symmetry
// ============================================

/// One store operation, with indexes resolved against whatever records
/// exist when it runs.
#[derive(Debug, Clone)]
enum Op {
    CreateCase { contacts: usize, tasks: usize },
    CreateContact { cases: usize },
    CreateTask { cases: usize },
    UpdateCase { target: usize, contacts: usize, tasks: usize },
    UpdateContact { target: usize, cases: usize },
    UpdateTask { target: usize, cases: usize },
    DeleteCase { target: usize },
    DeleteContact { target: usize },
    DeleteTask { target: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    let index = || 0usize..8;
    prop_oneof![
        (index(), index()).prop_map(|(contacts, tasks)| Op::CreateCase { contacts, tasks }),
        index().prop_map(|cases| Op::CreateContact { cases }),
        index().prop_map(|cases| Op::CreateTask { cases }),
        (index(), index(), index())
            .prop_map(|(target, contacts, tasks)| Op::UpdateCase { target, contacts, tasks }),
        (index(), index()).prop_map(|(target, cases)| Op::UpdateContact { target, cases }),
        (index(), index()).prop_map(|(target, cases)| Op::UpdateTask { target, cases }),
        index().prop_map(|target| Op::DeleteCase { target }),
        index().prop_map(|target| Op::DeleteContact { target }),
        index().prop_map(|target| Op::DeleteTask { target }),
    ]
}

/// Up to two ids starting at `offset`, wrapping around the list
fn pick(ids: &[String], offset: usize) -> Vec<String> {
    if ids.is_empty() {
        return Vec::new();
    }
    (0..ids.len().min(2))
        .map(|i| ids[(offset + i) % ids.len()].clone())
        .collect()
}

fn nth(ids: &[String], index: usize) -> Option<&String> {
    if ids.is_empty() {
        None
    } else {
        Some(&ids[index % ids.len()])
    }
}

fn apply(store: &mut Store<MemorySlots>, op: Op) {
    let case_ids: Vec<String> = store.cases().iter().map(|c| c.id.clone()).collect();
    let contact_ids: Vec<String> = store.contacts().iter().map(|c| c.id.clone()).collect();
    let task_ids: Vec<String> = store.tasks().iter().map(|t| t.id.clone()).collect();

    match op {
        Op::CreateCase { contacts, tasks } => {
            let mut input = CaseInput::new("Case", "Client");
            input.contact_ids = pick(&contact_ids, contacts);
            input.task_ids = pick(&task_ids, tasks);
            store.create_case(input).unwrap();
        }
        Op::CreateContact { cases } => {
            store
                .create_contact(contact_input("Kim", pick(&case_ids, cases)))
                .unwrap();
        }
        Op::CreateTask { cases } => {
            store
                .create_task(task_input("Draft", pick(&case_ids, cases)))
                .unwrap();
        }
        Op::UpdateCase {
            target,
            contacts,
            tasks,
        } => {
            if let Some(target) = nth(&case_ids, target) {
                let patch = CasePatch {
                    contact_ids: Some(pick(&contact_ids, contacts)),
                    task_ids: Some(pick(&task_ids, tasks)),
                    ..Default::default()
                };
                store.update_case(target, patch).unwrap();
            }
        }
        Op::UpdateContact { target, cases } => {
            if let Some(target) = nth(&contact_ids, target) {
                let patch = ContactPatch {
                    case_ids: Some(pick(&case_ids, cases)),
                    ..Default::default()
                };
                store.update_contact(target, patch).unwrap();
            }
        }
        Op::UpdateTask { target, cases } => {
            if let Some(target) = nth(&task_ids, target) {
                let patch = TaskPatch {
                    case_ids: Some(pick(&case_ids, cases)),
                    ..Default::default()
                };
                store.update_task(target, patch).unwrap();
            }
        }
        Op::DeleteCase { target } => {
            if let Some(target) = nth(&case_ids, target) {
                store.delete_case(target).unwrap();
            }
        }
        Op::DeleteContact { target } => {
            if let Some(target) = nth(&contact_ids, target) {
                store.delete_contact(target).unwrap();
            }
        }
        Op::DeleteTask { target } => {
            if let Some(target) = nth(&task_ids, target) {
                store.delete_task(target).unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any sequence of creates, updates, and deletes keeps every link
    /// mirrored on the other side.
    #[test]
    fn prop_symmetry_holds_across_mixed_operations(
        ops in prop::collection::vec(arb_op(), 1..60)
    ) {
        let mut store = Store::in_memory();
        for op in ops {
            apply(&mut store, op);
            assert_symmetric(&store);
        }
    }
}

#[test]
fn test_delete_case_cascades_to_contacts_and_tasks() {
    let mut store = Store::in_memory();
    let k1 = store.create_contact(contact_input("One", vec![])).unwrap();
    let k2 = store.create_contact(contact_input("Two", vec![])).unwrap();
    let t1 = store.create_task(task_input("Task", vec![])).unwrap();

    let mut input = CaseInput::new("Big case", "Client");
    input.contact_ids = vec![k1.clone(), k2.clone()];
    input.task_ids = vec![t1.clone()];
    let case = store.create_case(input).unwrap();

    assert!(store.contact(&k1).unwrap().case_ids.contains(&case));
    assert!(store.task(&t1).unwrap().case_ids.contains(&case));

    store.delete_case(&case).unwrap();

    assert!(!store.contact(&k1).unwrap().case_ids.contains(&case));
    assert!(!store.contact(&k2).unwrap().case_ids.contains(&case));
    assert!(!store.task(&t1).unwrap().case_ids.contains(&case));
    assert!(store.case(&case).unwrap_err().is_not_found());
    assert_symmetric(&store);
}

#[test]
fn test_created_contact_matches_input() {
    let mut store = Store::in_memory();
    let mut input = ContactInput::new(ContactType::OpposingCounsel, "Rita", "Moreno");
    input.organization = Some("Moreno & Partners".to_string());
    input.email = Some("rita@example.com".to_string());

    let id = store.create_contact(input.clone()).unwrap();
    let contact = store.contact(&id).unwrap();

    assert_eq!(contact.id, id);
    assert_eq!(contact.contact_type, input.contact_type);
    assert_eq!(contact.first_name, input.first_name);
    assert_eq!(contact.last_name, input.last_name);
    assert_eq!(contact.organization, input.organization);
    assert_eq!(contact.email, input.email);
    assert_eq!(contact.phone, None);
    assert!(contact.case_ids.is_empty());
    assert_eq!(contact.created_at, contact.updated_at);
}

#[test]
fn test_empty_update_only_bumps_timestamp() {
    let mut store = Store::in_memory();
    let case = store.create_case(CaseInput::new("A", "B")).unwrap();
    let mut input = ContactInput::new(ContactType::Client, "C", "D");
    input.case_ids = vec![case.clone()];
    store.create_contact(input).unwrap();

    let before = store.case(&case).unwrap().clone();
    store.update_case(&case, CasePatch::default()).unwrap();
    let after = store.case(&case).unwrap().clone();

    assert!(after.updated_at >= before.updated_at);
    let mut normalized = after.clone();
    normalized.updated_at = before.updated_at;
    assert_eq!(normalized, before);
    assert_symmetric(&store);
}

#[test]
fn test_contact_created_with_case_link_then_deleted() {
    let mut store = Store::in_memory();
    let case_a = store.create_case(CaseInput::new("A", "Client A")).unwrap();

    let contact_b = store
        .create_contact(contact_input("B", vec![case_a.clone()]))
        .unwrap();
    assert!(store.case(&case_a).unwrap().contact_ids.contains(&contact_b));

    store.delete_contact(&contact_b).unwrap();
    assert!(!store.case(&case_a).unwrap().contact_ids.contains(&contact_b));
}

#[test]
fn test_task_relinked_from_two_cases_to_one() {
    let mut store = Store::in_memory();
    let c1 = store.create_case(CaseInput::new("C1", "X")).unwrap();
    let c2 = store.create_case(CaseInput::new("C2", "Y")).unwrap();
    let t = store
        .create_task(task_input("T", vec![c1.clone(), c2.clone()]))
        .unwrap();

    let patch = TaskPatch {
        case_ids: Some(vec![c2.clone()]),
        ..Default::default()
    };
    store.update_task(&t, patch).unwrap();

    assert!(!store.case(&c1).unwrap().task_ids.contains(&t));
    assert!(store.case(&c2).unwrap().task_ids.contains(&t));
    assert_symmetric(&store);
}

#[test]
fn test_delete_contact_removes_interactions() {
    let mut store = Store::in_memory();
    let contact = store.create_contact(contact_input("Pat", vec![])).unwrap();
    let other = store.create_contact(contact_input("Lou", vec![])).unwrap();

    for who in [&contact, &contact, &other] {
        store
            .create_interaction(ContactInteractionInput {
                contact_id: who.clone(),
                case_id: None,
                kind: InteractionKind::Call,
                occurred_at: chrono::Utc::now(),
                summary: "Check-in".to_string(),
                follow_up_date: None,
            })
            .unwrap();
    }
    assert_eq!(store.interactions().len(), 3);

    store.delete_contact(&contact).unwrap();
    assert_eq!(store.interactions().len(), 1);
    assert_eq!(store.interactions()[0].contact_id, other);
}

// ============================================
// Persistence
// ============================================

#[test]
fn test_reopen_restores_equal_state() {
    let slots = MemorySlots::new();
    let mut store = open_memory(&slots);
    let case = store.create_case(CaseInput::new("A", "B")).unwrap();
    store.create_contact(contact_input("C", vec![case.clone()])).unwrap();
    store.create_task(task_input("T", vec![case])).unwrap();
    let goal = store
        .create_goal(GoalInput::new("Make partner", GoalHorizon::LongTerm))
        .unwrap();
    let mut project = ProjectInput::new("Publish article");
    project.goal_id = Some(goal);
    store.create_project(project).unwrap();
    store.complete_onboarding().unwrap();

    let reopened = open_memory(&slots);
    assert_eq!(reopened.state(), store.state());
}

#[test]
fn test_corrupt_snapshot_recovery() {
    for bytes in [&b"not json at all"[..], &b"{\"cases\": 1}"[..], &b"42"[..]] {
        let slots = MemorySlots::new();
        slots.write_batch(&[("cases", bytes.to_vec())]).unwrap();

        let err = Store::open(slots.clone(), RecoveryPolicy::Strict).err();
        assert!(matches!(err, Some(Error::CorruptState { .. })));

        let store = Store::open(slots, RecoveryPolicy::DiscardCorrupt).unwrap();
        assert!(store.cases().is_empty());
    }
}

#[test]
fn test_newer_snapshot_is_never_discarded() {
    let slots = MemorySlots::new();
    let bytes = br#"{"version": 99, "checksum": "x", "records": []}"#;
    slots.write_batch(&[("tasks", bytes.to_vec())]).unwrap();

    let err = Store::open(slots, RecoveryPolicy::DiscardCorrupt).err();
    assert!(matches!(err, Some(Error::UnsupportedVersion { found: 99, .. })));
}

#[test]
fn test_legacy_snapshot_rewritten_on_next_commit() {
    let slots = MemorySlots::new();
    let mut store = open_memory(&slots);
    store.create_task(TaskInput::new("Legacy task")).unwrap();

    // Re-store the tasks slot as a bare array, the pre-envelope format
    let tasks = serde_json::to_vec(store.tasks()).unwrap();
    slots.write_batch(&[("tasks", tasks)]).unwrap();

    let mut store = open_memory(&slots);
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.pending_rewrites(), vec![Slot::Tasks]);

    store
        .create_goal(GoalInput::new("Unrelated", GoalHorizon::Quarter))
        .unwrap();
    assert!(store.pending_rewrites().is_empty());

    let raw = slots.read("tasks").unwrap().unwrap();
    let decoded: snapshot::Decoded<Vec<Task>> = snapshot::decode(Slot::Tasks, &raw).unwrap();
    assert_eq!(decoded.version, snapshot::SNAPSHOT_VERSION);
    assert_eq!(decoded.value[0].title, "Legacy task");
}

#[test]
fn test_sqlite_round_trip_across_connections() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested/lifeos.db");

    let case_id = {
        let db = Database::open(&db_path).unwrap();
        db.migrate().unwrap();
        let mut store = Store::open(db, RecoveryPolicy::Strict).unwrap();
        let case = store.create_case(CaseInput::new("Persisted", "Client")).unwrap();
        store
            .create_contact(contact_input("Saved", vec![case.clone()]))
            .unwrap();
        case
    };

    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();
    let keys: Vec<String> = db.list_slots().unwrap().into_iter().map(|s| s.key).collect();
    assert_eq!(keys, vec!["cases".to_string(), "contacts".to_string()]);

    let store = Store::open(db, RecoveryPolicy::Strict).unwrap();
    let contacts = store.contacts_for_case(&case_id).unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].first_name, "Saved");
    assert_symmetric(&store);
}

#[test]
fn test_not_found_does_not_write() {
    let slots = MemorySlots::new();
    let mut store = open_memory(&slots);

    let err = store.delete_goal("missing").unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: EntityKind::Goal,
            ..
        }
    ));
    assert!(slots.keys().is_empty());
}
