//! Executes parsed commands against an open store.

use crate::cli::*;
use crate::output::{self, Printer};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use lifeos_core::*;
use std::process::ExitCode;

/// Turns a `--x VALUE` / `--clear-x` pair into a patch field.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

/// Turns repeated `--x ID` flags plus `--clear-x` into a replacement list.
fn replacement(ids: Vec<String>, clear: bool) -> Option<Vec<String>> {
    if clear {
        Some(Vec::new())
    } else if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

pub fn run(store: &mut Store<Database>, command: Command, out: &Printer) -> Result<ExitCode> {
    match command {
        Command::Case(cmd) => case(store, cmd, out)?,
        Command::Contact(cmd) => contact(store, cmd, out)?,
        Command::Task(cmd) => task(store, cmd, out)?,
        Command::Project(cmd) => project(store, cmd, out)?,
        Command::Goal(cmd) => goal(store, cmd, out)?,
        Command::Session(cmd) => session(store, cmd, out)?,
        Command::Interaction(cmd) => interaction(store, cmd, out)?,
        Command::Onboarding(cmd) => onboarding(store, cmd, out)?,
        Command::Doctor => return doctor(store, out),
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================
// Cases
// ============================================

fn case(store: &mut Store<Database>, cmd: CaseCommand, out: &Printer) -> Result<()> {
    match cmd {
        CaseCommand::Add(add) => {
            let mut input = CaseInput::new(add.title, add.client);
            input.description = add.description;
            input.case_type = add.case_type;
            input.status = add.status;
            input.priority = add.priority;
            if let Some(opened) = add.opened {
                input.opened_date = opened;
            }
            input.due_date = add.due;
            input.estimated_hours = add.estimated_hours;
            input.billing_rate = add.rate;
            input.contact_ids = add.contacts;
            input.task_ids = add.tasks;
            input.validate()?;

            let id = store.create_case(input).context("failed to create case")?;
            out.created("case", &id)
        }
        CaseCommand::List => out.list(store.cases(), output::case_row),
        CaseCommand::Show { id } => {
            let case = store.case(&id)?;
            let contacts = store.contacts_for_case(&id)?;
            let tasks = store.tasks_for_case(&id)?;
            let billable_minutes = store.billable_minutes_for_case(&id)?;

            if out.is_json() {
                return out.json(&serde_json::json!({
                    "case": case,
                    "contacts": contacts,
                    "tasks": tasks,
                    "billable_minutes": billable_minutes,
                }));
            }

            output::fields(&[
                ("id", case.id.clone()),
                ("title", case.title.clone()),
                ("client", case.client_name.clone()),
                ("type", case.case_type.to_string()),
                ("status", case.status.to_string()),
                ("priority", case.priority.to_string()),
                ("opened", case.opened_date.to_string()),
                ("due", output::opt_date(case.due_date)),
                ("closed", output::opt_date(case.closed_date)),
                ("hours", format!("{:.1}", case.actual_hours)),
                ("billable", format!("{billable_minutes} min")),
            ]);
            if !case.description.is_empty() {
                println!("\n{}", case.description);
            }
            println!("\nContacts:");
            for contact in contacts {
                println!("  {}", output::contact_row(contact));
            }
            println!("\nTasks:");
            for task in tasks {
                println!("  {}", output::task_row(task));
            }
            Ok(())
        }
        CaseCommand::Update(update) => {
            let patch = CasePatch {
                title: update.title,
                client_name: update.client,
                description: update.description,
                case_type: update.case_type,
                status: update.status,
                priority: update.priority,
                due_date: clearable(update.due, update.clear_due),
                actual_hours: update.actual_hours,
                billing_rate: update.rate.map(Some),
                contact_ids: replacement(update.contacts, update.clear_contacts),
                task_ids: replacement(update.tasks, update.clear_tasks),
                ..CasePatch::default()
            };
            patch.validate()?;
            store
                .update_case(&update.id, patch)
                .with_context(|| format!("failed to update case {}", update.id))?;
            out.done(&format!("Updated case {}", update.id))
        }
        CaseCommand::Delete { id } => {
            store
                .delete_case(&id)
                .with_context(|| format!("failed to delete case {id}"))?;
            out.done(&format!("Deleted case {id}"))
        }
        CaseCommand::Link(link) => {
            match (&link.contact, &link.task) {
                (Some(contact), _) => store.link_contact(&link.case_id, contact)?,
                (None, Some(task)) => store.link_task(&link.case_id, task)?,
                (None, None) => anyhow::bail!("pass --contact or --task"),
            }
            out.done(&format!("Linked case {}", link.case_id))
        }
        CaseCommand::Unlink(link) => {
            match (&link.contact, &link.task) {
                (Some(contact), _) => store.unlink_contact(&link.case_id, contact)?,
                (None, Some(task)) => store.unlink_task(&link.case_id, task)?,
                (None, None) => anyhow::bail!("pass --contact or --task"),
            }
            out.done(&format!("Unlinked case {}", link.case_id))
        }
    }
}

// ============================================
// Contacts
// ============================================

fn contact(store: &mut Store<Database>, cmd: ContactCommand, out: &Printer) -> Result<()> {
    match cmd {
        ContactCommand::Add(add) => {
            let mut input = ContactInput::new(add.contact_type, add.first, add.last);
            input.organization = add.organization;
            input.email = add.email;
            input.phone = add.phone;
            input.case_ids = add.cases;
            input.validate()?;

            let id = store
                .create_contact(input)
                .context("failed to create contact")?;
            out.created("contact", &id)
        }
        ContactCommand::List => out.list(store.contacts(), output::contact_row),
        ContactCommand::Show { id } => {
            let contact = store.contact(&id)?;
            let cases = store.cases_for_contact(&id)?;
            let interactions = store.interactions_for_contact(&id)?;

            if out.is_json() {
                return out.json(&serde_json::json!({
                    "contact": contact,
                    "cases": cases,
                    "interactions": interactions,
                }));
            }

            output::fields(&[
                ("id", contact.id.clone()),
                ("name", contact.display_name()),
                ("type", contact.contact_type.to_string()),
                ("organization", output::opt_text(contact.organization.as_deref())),
                ("email", output::opt_text(contact.email.as_deref())),
                ("phone", output::opt_text(contact.phone.as_deref())),
            ]);
            println!("\nCases:");
            for case in cases {
                println!("  {}", output::case_row(case));
            }
            println!("\nInteractions:");
            for interaction in interactions {
                println!("  {}", output::interaction_row(interaction));
            }
            Ok(())
        }
        ContactCommand::Update(update) => {
            let patch = ContactPatch {
                contact_type: update.contact_type,
                first_name: update.first,
                last_name: update.last,
                organization: update.organization.map(Some),
                email: update.email.map(Some),
                phone: update.phone.map(Some),
                notes: update.notes.map(Some),
                case_ids: replacement(update.cases, update.clear_cases),
                ..ContactPatch::default()
            };
            store
                .update_contact(&update.id, patch)
                .with_context(|| format!("failed to update contact {}", update.id))?;
            out.done(&format!("Updated contact {}", update.id))
        }
        ContactCommand::Delete { id } => {
            store
                .delete_contact(&id)
                .with_context(|| format!("failed to delete contact {id}"))?;
            out.done(&format!("Deleted contact {id}"))
        }
    }
}

// ============================================
// Tasks
// ============================================

fn task(store: &mut Store<Database>, cmd: TaskCommand, out: &Printer) -> Result<()> {
    match cmd {
        TaskCommand::Add(add) => {
            let mut input = TaskInput::new(add.title);
            input.description = add.description;
            input.status = add.status;
            input.priority = add.priority;
            input.due_date = add.due;
            input.scheduled_date = add.scheduled;
            input.estimated_minutes = add.estimate;
            input.case_ids = add.cases;
            input.project_ids = add.projects;
            input.validate()?;

            let id = store.create_task(input).context("failed to create task")?;
            out.created("task", &id)
        }
        TaskCommand::List { status } => out.list(
            store
                .tasks()
                .iter()
                .filter(|task| status.map_or(true, |s| task.status == s)),
            output::task_row,
        ),
        TaskCommand::Show { id } => {
            let task = store.task(&id)?;
            if out.is_json() {
                return out.json(task);
            }
            output::fields(&[
                ("id", task.id.clone()),
                ("title", task.title.clone()),
                ("status", task.status.to_string()),
                ("priority", task.priority.to_string()),
                ("due", output::opt_date(task.due_date)),
                ("scheduled", output::opt_date(task.scheduled_date)),
                ("cases", task.case_ids.join(", ")),
                ("projects", task.project_ids.join(", ")),
            ]);
            Ok(())
        }
        TaskCommand::Update(update) => {
            let patch = TaskPatch {
                title: update.title,
                status: update.status,
                priority: update.priority,
                due_date: clearable(update.due, update.clear_due),
                case_ids: replacement(update.cases, update.clear_cases),
                project_ids: replacement(update.projects, update.clear_projects),
                ..TaskPatch::default()
            };
            patch.validate()?;
            store
                .update_task(&update.id, patch)
                .with_context(|| format!("failed to update task {}", update.id))?;
            out.done(&format!("Updated task {}", update.id))
        }
        TaskCommand::Delete { id } => {
            store
                .delete_task(&id)
                .with_context(|| format!("failed to delete task {id}"))?;
            out.done(&format!("Deleted task {id}"))
        }
    }
}

// ============================================
// Projects & goals
// ============================================

fn project(store: &mut Store<Database>, cmd: ProjectCommand, out: &Printer) -> Result<()> {
    match cmd {
        ProjectCommand::Add {
            title,
            description,
            goal,
            due,
        } => {
            let mut input = ProjectInput::new(title);
            input.description = description;
            input.goal_id = goal;
            input.due_date = due;
            input.validate()?;

            let id = store
                .create_project(input)
                .context("failed to create project")?;
            out.created("project", &id)
        }
        ProjectCommand::List => out.list(store.projects(), output::project_row),
        ProjectCommand::Show { id } => {
            let project = store.project(&id)?;
            let tasks = store.tasks_for_project(&id)?;
            if out.is_json() {
                return out.json(&serde_json::json!({ "project": project, "tasks": tasks }));
            }
            output::fields(&[
                ("id", project.id.clone()),
                ("title", project.title.clone()),
                ("status", project.status.to_string()),
                ("goal", output::opt_text(project.goal_id.as_deref())),
                ("due", output::opt_date(project.due_date)),
            ]);
            println!("\nTasks:");
            for task in tasks {
                println!("  {}", output::task_row(task));
            }
            Ok(())
        }
        ProjectCommand::Update {
            id,
            title,
            status,
            goal,
            clear_goal,
        } => {
            let patch = ProjectPatch {
                title,
                status,
                goal_id: clearable(goal, clear_goal),
                ..ProjectPatch::default()
            };
            store
                .update_project(&id, patch)
                .with_context(|| format!("failed to update project {id}"))?;
            out.done(&format!("Updated project {id}"))
        }
        ProjectCommand::Delete { id } => {
            store
                .delete_project(&id)
                .with_context(|| format!("failed to delete project {id}"))?;
            out.done(&format!("Deleted project {id}"))
        }
    }
}

fn goal(store: &mut Store<Database>, cmd: GoalCommand, out: &Printer) -> Result<()> {
    match cmd {
        GoalCommand::Add {
            title,
            horizon,
            target,
        } => {
            let mut input = GoalInput::new(title, horizon);
            input.target_date = target;
            input.validate()?;

            let id = store.create_goal(input).context("failed to create goal")?;
            out.created("goal", &id)
        }
        GoalCommand::List => out.list(store.goals(), output::goal_row),
        GoalCommand::Show { id } => {
            let goal = store.goal(&id)?;
            let projects = store.projects_for_goal(&id)?;
            if out.is_json() {
                return out.json(&serde_json::json!({ "goal": goal, "projects": projects }));
            }
            output::fields(&[
                ("id", goal.id.clone()),
                ("title", goal.title.clone()),
                ("horizon", goal.horizon.to_string()),
                ("status", goal.status.to_string()),
                ("progress", format!("{}%", goal.progress)),
                ("target", output::opt_date(goal.target_date)),
            ]);
            println!("\nProjects:");
            for project in projects {
                println!("  {}", output::project_row(project));
            }
            Ok(())
        }
        GoalCommand::Update {
            id,
            title,
            status,
            progress,
        } => {
            let patch = GoalPatch {
                title,
                status,
                progress,
                ..GoalPatch::default()
            };
            patch.validate()?;
            store
                .update_goal(&id, patch)
                .with_context(|| format!("failed to update goal {id}"))?;
            out.done(&format!("Updated goal {id}"))
        }
        GoalCommand::Delete { id } => {
            store
                .delete_goal(&id)
                .with_context(|| format!("failed to delete goal {id}"))?;
            out.done(&format!("Deleted goal {id}"))
        }
    }
}

// ============================================
// Sessions & interactions
// ============================================

fn session(store: &mut Store<Database>, cmd: SessionCommand, out: &Printer) -> Result<()> {
    match cmd {
        SessionCommand::Add {
            case,
            task,
            minutes,
            started,
            billable,
            notes,
        } => {
            let span = Duration::minutes(i64::from(minutes));
            let started_at = started.unwrap_or_else(|| Utc::now() - span);
            let mut input = WorkSessionInput::starting_at(started_at);
            input.case_id = case;
            input.task_id = task;
            input.ended_at = Some(started_at + span);
            input.duration_minutes = Some(minutes);
            input.billable = billable;
            input.notes = notes;
            input.validate()?;

            let id = store
                .create_session(input)
                .context("failed to record work session")?;
            out.created("work_session", &id)
        }
        SessionCommand::List { case } => match case {
            Some(case_id) => out.list(store.sessions_for_case(&case_id)?, output::session_row),
            None => out.list(store.sessions(), output::session_row),
        },
        SessionCommand::Show { id } => {
            let session = store.session(&id)?;
            if out.is_json() {
                return out.json(session);
            }
            output::fields(&[
                ("id", session.id.clone()),
                ("case", output::opt_text(session.case_id.as_deref())),
                ("task", output::opt_text(session.task_id.as_deref())),
                ("started", session.started_at.to_rfc3339()),
                ("minutes", session.minutes().to_string()),
                ("billable", session.billable.to_string()),
                ("notes", output::opt_text(session.notes.as_deref())),
            ]);
            Ok(())
        }
        SessionCommand::Update {
            id,
            case,
            clear_case,
            task,
            clear_task,
            minutes,
            billable,
            notes,
        } => {
            let patch = WorkSessionPatch {
                case_id: clearable(case, clear_case),
                task_id: clearable(task, clear_task),
                duration_minutes: minutes.map(Some),
                billable,
                notes: notes.map(Some),
                ..WorkSessionPatch::default()
            };
            store
                .update_session(&id, patch)
                .with_context(|| format!("failed to update work session {id}"))?;
            out.done(&format!("Updated work session {id}"))
        }
        SessionCommand::Delete { id } => {
            store
                .delete_session(&id)
                .with_context(|| format!("failed to delete work session {id}"))?;
            out.done(&format!("Deleted work session {id}"))
        }
    }
}

fn interaction(store: &mut Store<Database>, cmd: InteractionCommand, out: &Printer) -> Result<()> {
    match cmd {
        InteractionCommand::Add {
            contact,
            case,
            kind,
            summary,
            at,
            follow_up,
        } => {
            let input = ContactInteractionInput {
                contact_id: contact,
                case_id: case,
                kind,
                occurred_at: at.unwrap_or_else(Utc::now),
                summary,
                follow_up_date: follow_up,
            };
            input.validate()?;

            let id = store
                .create_interaction(input)
                .context("failed to log interaction")?;
            out.created("contact_interaction", &id)
        }
        InteractionCommand::List { contact } => match contact {
            Some(contact_id) => out.list(
                store.interactions_for_contact(&contact_id)?,
                output::interaction_row,
            ),
            None => out.list(store.interactions(), output::interaction_row),
        },
        InteractionCommand::Show { id } => {
            let interaction = store.interaction(&id)?;
            if out.is_json() {
                return out.json(interaction);
            }
            output::fields(&[
                ("id", interaction.id.clone()),
                ("contact", interaction.contact_id.clone()),
                ("case", output::opt_text(interaction.case_id.as_deref())),
                ("kind", interaction.kind.to_string()),
                ("when", interaction.occurred_at.to_rfc3339()),
                ("follow up", output::opt_date(interaction.follow_up_date)),
                ("summary", interaction.summary.clone()),
            ]);
            Ok(())
        }
        InteractionCommand::Update {
            id,
            case,
            clear_case,
            kind,
            summary,
            follow_up,
            clear_follow_up,
        } => {
            let patch = ContactInteractionPatch {
                case_id: clearable(case, clear_case),
                kind,
                summary,
                follow_up_date: clearable(follow_up, clear_follow_up),
                ..ContactInteractionPatch::default()
            };
            store
                .update_interaction(&id, patch)
                .with_context(|| format!("failed to update interaction {id}"))?;
            out.done(&format!("Updated interaction {id}"))
        }
        InteractionCommand::Delete { id } => {
            store
                .delete_interaction(&id)
                .with_context(|| format!("failed to delete interaction {id}"))?;
            out.done(&format!("Deleted interaction {id}"))
        }
    }
}

// ============================================
// Onboarding & doctor
// ============================================

fn onboarding(store: &mut Store<Database>, cmd: OnboardingCommand, out: &Printer) -> Result<()> {
    match cmd {
        OnboardingCommand::Status => {
            let state = store.onboarding();
            if out.is_json() {
                return out.json(&serde_json::json!({
                    "state": state,
                    "should_show": state.should_show(),
                }));
            }
            output::fields(&[
                ("first run", state.first_run.to_string()),
                ("completed", state.completed.to_string()),
                ("skipped", state.skipped.to_string()),
                ("show", state.should_show().to_string()),
            ]);
            Ok(())
        }
        OnboardingCommand::Complete => {
            store.complete_onboarding()?;
            out.done("Onboarding completed")
        }
        OnboardingCommand::Skip => {
            store.skip_onboarding()?;
            out.done("Onboarding skipped")
        }
        OnboardingCommand::Reset => {
            store.reset_onboarding()?;
            out.done("Onboarding reset")
        }
    }
}

fn doctor(store: &Store<Database>, out: &Printer) -> Result<ExitCode> {
    let slots = store
        .backend()
        .list_slots()
        .context("failed to list stored slots")?;
    let pending: Vec<&str> = store.pending_rewrites().iter().map(|s| s.key()).collect();
    let schema_version = lifeos_core::db::schema::get_schema_version(&store.backend().connection())
        .context("failed to read schema version")?;
    let log_path = lifeos_core::logging::log_file_path();
    let violations = store.check_integrity();
    let state = store.state();

    tracing::info!(
        records = state.record_count(),
        violations = violations.len(),
        "Integrity check finished"
    );

    if out.is_json() {
        let slots: Vec<_> = slots
            .iter()
            .map(|slot| {
                serde_json::json!({
                    "key": slot.key,
                    "size_bytes": slot.size_bytes,
                    "updated_at": slot.updated_at,
                })
            })
            .collect();
        let violations: Vec<String> = violations.iter().map(ToString::to_string).collect();
        out.json(&serde_json::json!({
            "schema_version": schema_version,
            "log_file": log_path,
            "slots": slots,
            "records": state.record_count(),
            "pending_rewrites": pending,
            "violations": violations,
        }))?;
    } else {
        println!("Schema version: {schema_version}");
        println!("Log file: {}", log_path.display());
        println!("Slots:");
        for slot in &slots {
            let updated = slot
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<22} {:>8} bytes  {}", slot.key, slot.size_bytes, updated);
        }
        output::fields(&[
            ("cases", state.cases.len().to_string()),
            ("contacts", state.contacts.len().to_string()),
            ("tasks", state.tasks.len().to_string()),
            ("projects", state.projects.len().to_string()),
            ("goals", state.goals.len().to_string()),
            ("work sessions", state.sessions.len().to_string()),
            ("interactions", state.interactions.len().to_string()),
        ]);
        if !pending.is_empty() {
            println!("Pending rewrites: {}", pending.join(", "));
        }
        if violations.is_empty() {
            println!("No integrity problems found");
        } else {
            println!("{} integrity problem(s):", violations.len());
            for violation in &violations {
                println!("  {violation}");
            }
        }
    }

    Ok(if violations.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
