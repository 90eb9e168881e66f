//! Plain-text and JSON rendering of store records.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lifeos_core::{Case, Contact, ContactInteraction, Goal, Project, Task, WorkSession};
use serde::Serialize;

/// Prints command results either as aligned text rows or as JSON.
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
        println!("{rendered}");
        Ok(())
    }

    /// Print a collection, one row per record
    pub fn list<'a, T, I>(&self, items: I, row: fn(&T) -> String) -> Result<()>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let items: Vec<&T> = items.into_iter().collect();
        if self.json {
            return self.json(&items);
        }
        if items.is_empty() {
            println!("(none)");
        }
        for item in items {
            println!("{}", row(item));
        }
        Ok(())
    }

    /// Report the id of a newly created record
    pub fn created(&self, kind: &str, id: &str) -> Result<()> {
        if self.json {
            return self.json(&serde_json::json!({ "kind": kind, "id": id }));
        }
        println!("Created {kind} {id}");
        Ok(())
    }

    /// Report a successful change that produced no record
    pub fn done(&self, message: &str) -> Result<()> {
        if self.json {
            return self.json(&serde_json::json!({ "ok": true, "message": message }));
        }
        println!("{message}");
        Ok(())
    }
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn case_row(case: &Case) -> String {
    format!(
        "{}  {:<8} {:<6} due {:<10}  {} ({})",
        case.id, case.status, case.priority, date(case.due_date), case.title, case.client_name
    )
}

pub fn contact_row(contact: &Contact) -> String {
    let organization = contact
        .organization
        .as_deref()
        .map(|org| format!(" [{org}]"))
        .unwrap_or_default();
    format!(
        "{}  {:<16} {}{}",
        contact.id,
        contact.contact_type,
        contact.display_name(),
        organization
    )
}

pub fn task_row(task: &Task) -> String {
    format!(
        "{}  {:<11} {:<8} due {:<10}  {}",
        task.id, task.status, task.priority, date(task.due_date), task.title
    )
}

pub fn project_row(project: &Project) -> String {
    format!("{}  {:<9} {}", project.id, project.status, project.title)
}

pub fn goal_row(goal: &Goal) -> String {
    format!(
        "{}  {:<9} {:<9} {:>3}%  {}",
        goal.id, goal.status, goal.horizon, goal.progress, goal.title
    )
}

pub fn session_row(session: &WorkSession) -> String {
    format!(
        "{}  {}  {:>4} min  {}  case {}",
        session.id,
        session.started_at.format("%Y-%m-%d %H:%M"),
        session.minutes(),
        if session.billable { "billable" } else { "internal" },
        session.case_id.as_deref().unwrap_or("-")
    )
}

pub fn interaction_row(interaction: &ContactInteraction) -> String {
    format!(
        "{}  {}  {:<16} contact {}  {}",
        interaction.id,
        interaction.occurred_at.format("%Y-%m-%d %H:%M"),
        interaction.kind,
        interaction.contact_id,
        interaction.summary
    )
}

/// Print `label: value` detail lines
pub fn fields(pairs: &[(&str, String)]) {
    let width = pairs.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in pairs {
        println!("{label:<width$}  {value}");
    }
}

pub fn opt_date(value: Option<NaiveDate>) -> String {
    date(value)
}

pub fn opt_text(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
