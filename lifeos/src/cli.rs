//! Command-line definitions.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use lifeos_core::{
    CasePriority, CaseStatus, CaseType, ContactType, GoalHorizon, GoalStatus, InteractionKind,
    ProjectStatus, TaskPriority, TaskStatus,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lifeos")]
#[command(about = "Cases, tasks, goals, and contacts in one local store")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Start unreadable collections empty instead of failing
    #[arg(long, global = true)]
    pub discard_corrupt: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage cases
    #[command(subcommand)]
    Case(CaseCommand),
    /// Manage contacts
    #[command(subcommand)]
    Contact(ContactCommand),
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage goals
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Record and list work sessions
    #[command(subcommand)]
    Session(SessionCommand),
    /// Log and list contact interactions
    #[command(subcommand)]
    Interaction(InteractionCommand),
    /// Show or change first-run onboarding state
    #[command(subcommand)]
    Onboarding(OnboardingCommand),
    /// Check store integrity and show stored slots
    Doctor,
}

impl Command {
    /// True if the command can change the store
    pub fn is_mutating(&self) -> bool {
        match self {
            Command::Case(c) => !matches!(c, CaseCommand::List | CaseCommand::Show { .. }),
            Command::Contact(c) => {
                !matches!(c, ContactCommand::List | ContactCommand::Show { .. })
            }
            Command::Task(c) => !matches!(c, TaskCommand::List { .. } | TaskCommand::Show { .. }),
            Command::Project(c) => {
                !matches!(c, ProjectCommand::List | ProjectCommand::Show { .. })
            }
            Command::Goal(c) => !matches!(c, GoalCommand::List | GoalCommand::Show { .. }),
            Command::Session(c) => {
                !matches!(c, SessionCommand::List { .. } | SessionCommand::Show { .. })
            }
            Command::Interaction(c) => !matches!(
                c,
                InteractionCommand::List { .. } | InteractionCommand::Show { .. }
            ),
            Command::Onboarding(c) => !matches!(c, OnboardingCommand::Status),
            Command::Doctor => false,
        }
    }
}

// ============================================
// Cases
// ============================================

#[derive(Subcommand, Debug)]
pub enum CaseCommand {
    /// Open a new case
    Add(CaseAdd),
    /// List cases
    List,
    /// Show a case with its contacts, tasks, and billable time
    Show { id: String },
    /// Change fields of a case
    Update(CaseUpdate),
    /// Delete a case and unlink it everywhere
    Delete { id: String },
    /// Link a contact or task to a case
    Link(CaseLink),
    /// Unlink a contact or task from a case
    Unlink(CaseLink),
}

#[derive(Args, Debug)]
pub struct CaseAdd {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub client: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long = "type", default_value = "other")]
    pub case_type: CaseType,
    #[arg(long, default_value = "active")]
    pub status: CaseStatus,
    #[arg(long, default_value = "medium")]
    pub priority: CasePriority,
    /// Opening date (YYYY-MM-DD, default today)
    #[arg(long)]
    pub opened: Option<NaiveDate>,
    #[arg(long)]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub estimated_hours: Option<f64>,
    #[arg(long)]
    pub rate: Option<f64>,
    /// Contact to link (repeatable)
    #[arg(long = "contact")]
    pub contacts: Vec<String>,
    /// Task to link (repeatable)
    #[arg(long = "task")]
    pub tasks: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CaseUpdate {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "type")]
    pub case_type: Option<CaseType>,
    #[arg(long)]
    pub status: Option<CaseStatus>,
    #[arg(long)]
    pub priority: Option<CasePriority>,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long)]
    pub actual_hours: Option<f64>,
    #[arg(long)]
    pub rate: Option<f64>,
    /// Replace linked contacts (repeatable)
    #[arg(long = "contact", conflicts_with = "clear_contacts")]
    pub contacts: Vec<String>,
    /// Unlink every contact
    #[arg(long)]
    pub clear_contacts: bool,
    /// Replace linked tasks (repeatable)
    #[arg(long = "task", conflicts_with = "clear_tasks")]
    pub tasks: Vec<String>,
    /// Unlink every task
    #[arg(long)]
    pub clear_tasks: bool,
}

#[derive(Args, Debug)]
pub struct CaseLink {
    pub case_id: String,
    #[arg(long, required_unless_present = "task", conflicts_with = "task")]
    pub contact: Option<String>,
    #[arg(long)]
    pub task: Option<String>,
}

// ============================================
// Contacts
// ============================================

#[derive(Subcommand, Debug)]
pub enum ContactCommand {
    /// Add a contact
    Add(ContactAdd),
    /// List contacts
    List,
    /// Show a contact with its cases and interactions
    Show { id: String },
    /// Change fields of a contact
    Update(ContactUpdate),
    /// Delete a contact, its interactions, and its case links
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct ContactAdd {
    #[arg(long)]
    pub first: String,
    #[arg(long, default_value = "")]
    pub last: String,
    #[arg(long = "type", default_value = "other")]
    pub contact_type: ContactType,
    #[arg(long)]
    pub organization: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    /// Case to link (repeatable)
    #[arg(long = "case")]
    pub cases: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ContactUpdate {
    pub id: String,
    #[arg(long)]
    pub first: Option<String>,
    #[arg(long)]
    pub last: Option<String>,
    #[arg(long = "type")]
    pub contact_type: Option<ContactType>,
    #[arg(long)]
    pub organization: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Replace linked cases (repeatable)
    #[arg(long = "case", conflicts_with = "clear_cases")]
    pub cases: Vec<String>,
    /// Unlink every case
    #[arg(long)]
    pub clear_cases: bool,
}

// ============================================
// Tasks
// ============================================

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task
    Add(TaskAdd),
    /// List tasks
    List {
        /// Only tasks in this status
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    Show {
        id: String,
    },
    /// Change fields of a task
    Update(TaskUpdate),
    /// Delete a task and unlink it from its cases
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, default_value = "inbox")]
    pub status: TaskStatus,
    #[arg(long, default_value = "P2")]
    pub priority: TaskPriority,
    #[arg(long)]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub scheduled: Option<NaiveDate>,
    #[arg(long)]
    pub estimate: Option<u32>,
    /// Case to link (repeatable)
    #[arg(long = "case")]
    pub cases: Vec<String>,
    /// Project to attach (repeatable)
    #[arg(long = "project")]
    pub projects: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TaskUpdate {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,
    #[arg(long)]
    pub clear_due: bool,
    /// Replace linked cases (repeatable)
    #[arg(long = "case", conflicts_with = "clear_cases")]
    pub cases: Vec<String>,
    /// Unlink every case
    #[arg(long)]
    pub clear_cases: bool,
    /// Replace attached projects (repeatable)
    #[arg(long = "project", conflicts_with = "clear_projects")]
    pub projects: Vec<String>,
    #[arg(long)]
    pub clear_projects: bool,
}

// ============================================
// Projects & goals
// ============================================

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    List,
    /// Show a project with its tasks
    Show { id: String },
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<ProjectStatus>,
        #[arg(long, conflicts_with = "clear_goal")]
        goal: Option<String>,
        #[arg(long)]
        clear_goal: bool,
    },
    /// Delete a project and detach it from its tasks
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "year")]
        horizon: GoalHorizon,
        #[arg(long)]
        target: Option<NaiveDate>,
    },
    List,
    /// Show a goal with its projects
    Show { id: String },
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<GoalStatus>,
        /// Percent complete (0-100)
        #[arg(long)]
        progress: Option<u8>,
    },
    /// Delete a goal and detach its projects
    Delete { id: String },
}

// ============================================
// Sessions & interactions
// ============================================

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Record a block of work
    Add {
        #[arg(long)]
        case: Option<String>,
        #[arg(long)]
        task: Option<String>,
        /// Minutes worked
        #[arg(long)]
        minutes: u32,
        /// Start time (RFC 3339, default now minus minutes)
        #[arg(long)]
        started: Option<DateTime<Utc>>,
        #[arg(long)]
        billable: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        /// Only sessions for this case
        #[arg(long)]
        case: Option<String>,
    },
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long, conflicts_with = "clear_case")]
        case: Option<String>,
        #[arg(long)]
        clear_case: bool,
        #[arg(long, conflicts_with = "clear_task")]
        task: Option<String>,
        #[arg(long)]
        clear_task: bool,
        #[arg(long)]
        minutes: Option<u32>,
        /// true or false
        #[arg(long)]
        billable: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum InteractionCommand {
    /// Log an interaction with a contact
    Add {
        #[arg(long)]
        contact: String,
        #[arg(long)]
        case: Option<String>,
        #[arg(long, default_value = "call")]
        kind: InteractionKind,
        #[arg(long)]
        summary: String,
        /// When it happened (RFC 3339, default now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long)]
        follow_up: Option<NaiveDate>,
    },
    List {
        /// Only interactions with this contact
        #[arg(long)]
        contact: Option<String>,
    },
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long, conflicts_with = "clear_case")]
        case: Option<String>,
        #[arg(long)]
        clear_case: bool,
        #[arg(long)]
        kind: Option<InteractionKind>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long, conflicts_with = "clear_follow_up")]
        follow_up: Option<NaiveDate>,
        #[arg(long)]
        clear_follow_up: bool,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum OnboardingCommand {
    Status,
    Complete,
    Skip,
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_case_add_with_links() {
        let cli = Cli::try_parse_from([
            "lifeos",
            "case",
            "add",
            "--title",
            "Acme v. Smith",
            "--client",
            "Acme",
            "--type",
            "litigation",
            "--contact",
            "k1",
            "--contact",
            "k2",
        ])
        .unwrap();

        match cli.command {
            Command::Case(CaseCommand::Add(add)) => {
                assert_eq!(add.case_type, CaseType::Litigation);
                assert_eq!(add.contacts, vec!["k1", "k2"]);
                assert_eq!(add.priority, CasePriority::Medium);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_read_commands_are_not_mutating() {
        let list = Cli::try_parse_from(["lifeos", "task", "list"]).unwrap();
        assert!(!list.command.is_mutating());
        let add = Cli::try_parse_from(["lifeos", "goal", "add", "--title", "G"]).unwrap();
        assert!(add.command.is_mutating());
    }

    #[test]
    fn test_bad_enum_value_rejected() {
        let result = Cli::try_parse_from(["lifeos", "task", "add", "--title", "T", "--priority", "urgent"]);
        assert!(result.is_err());
    }
}
