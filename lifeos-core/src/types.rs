//! Core domain types for Life OS
//!
//! These types are the records held by the [`Store`](crate::store::Store) and
//! persisted as collection snapshots.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Case** | A legal matter handled for a client |
//! | **Contact** | A person involved in one or more Cases (client, judge, counsel...) |
//! | **Task** | A unit of work, optionally tied to Cases and Projects |
//! | **Project** | A multi-task effort, optionally serving a Goal |
//! | **Goal** | A longer-horizon objective |
//! | **WorkSession** | A block of time spent on a Case and/or Task |
//! | **ContactInteraction** | A logged call, email, or meeting with a Contact |
//!
//! ### Links
//!
//! Case↔Contact and Case↔Task links are stored on both sides
//! (`Case::contact_ids` / `Contact::case_ids`, `Case::task_ids` /
//! `Task::case_ids`). The store keeps both sides in agreement; callers never
//! edit one side by hand.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Declares a snake_case string enum with `as_str`, `FromStr`, and `Display`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// All variants, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the identifier used in snapshots and on the command line
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "unknown {}: {} (expected one of: {})",
                        stringify!($name),
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

// ============================================
// Entity kinds
// ============================================

string_enum! {
    /// Every record type the store holds
    pub enum EntityKind {
        Case => "case",
        Project => "project",
        Task => "task",
        Goal => "goal",
        WorkSession => "work_session",
        Contact => "contact",
        ContactInteraction => "contact_interaction",
    }
}

/// Uniform access to the fields every stored record has.
pub trait Record: Clone {
    /// Which collection this record lives in
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Sets `updated_at`
    fn touch(&mut self, now: DateTime<Utc>);
}

macro_rules! impl_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn touch(&mut self, now: DateTime<Utc>) {
                self.updated_at = now;
            }
        }
    };
}

// ============================================
// Case
// ============================================

string_enum! {
    /// Area of law a case falls under
    pub enum CaseType {
        Litigation => "litigation",
        Contract => "contract",
        Corporate => "corporate",
        Employment => "employment",
        RealEstate => "real_estate",
        Family => "family",
        Criminal => "criminal",
        IntellectualProperty => "intellectual_property",
        Other => "other",
    }
}

string_enum! {
    pub enum CaseStatus {
        Active => "active",
        Pending => "pending",
        Closed => "closed",
        OnHold => "on_hold",
    }
}

string_enum! {
    pub enum CasePriority {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

/// A legal matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    pub client_name: String,
    pub description: String,
    pub case_type: CaseType,
    pub status: CaseStatus,
    pub priority: CasePriority,
    pub opened_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    /// Hourly rate
    pub billing_rate: Option<f64>,
    /// Contacts involved in this case (mirrored by `Contact::case_ids`)
    pub contact_ids: Vec<String>,
    /// Tasks belonging to this case (mirrored by `Task::case_ids`)
    pub task_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Case, EntityKind::Case);

/// Fields for creating a [`Case`].
#[derive(Debug, Clone, PartialEq)]
pub struct CaseInput {
    pub title: String,
    pub client_name: String,
    pub description: String,
    pub case_type: CaseType,
    pub status: CaseStatus,
    pub priority: CasePriority,
    pub opened_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub billing_rate: Option<f64>,
    pub contact_ids: Vec<String>,
    pub task_ids: Vec<String>,
}

impl CaseInput {
    /// A new active, medium-priority case opened today
    pub fn new(title: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            client_name: client_name.into(),
            description: String::new(),
            case_type: CaseType::Other,
            status: CaseStatus::Active,
            priority: CasePriority::Medium,
            opened_date: Utc::now().date_naive(),
            due_date: None,
            closed_date: None,
            estimated_hours: None,
            actual_hours: 0.0,
            billing_rate: None,
            contact_ids: Vec::new(),
            task_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        require_text("case title", &self.title)?;
        require_text("client name", &self.client_name)?;
        require_non_negative("estimated hours", self.estimated_hours)?;
        require_non_negative("actual hours", Some(self.actual_hours))?;
        require_non_negative("billing rate", self.billing_rate)
    }
}

/// Partial update for a [`Case`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasePatch {
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub description: Option<String>,
    pub case_type: Option<CaseType>,
    pub status: Option<CaseStatus>,
    pub priority: Option<CasePriority>,
    pub opened_date: Option<NaiveDate>,
    pub due_date: Option<Option<NaiveDate>>,
    pub closed_date: Option<Option<NaiveDate>>,
    pub estimated_hours: Option<Option<f64>>,
    pub actual_hours: Option<f64>,
    pub billing_rate: Option<Option<f64>>,
    pub contact_ids: Option<Vec<String>>,
    pub task_ids: Option<Vec<String>>,
}

impl CasePatch {
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(title) = &self.title {
            require_text("case title", title)?;
        }
        if let Some(client) = &self.client_name {
            require_text("client name", client)?;
        }
        require_non_negative("estimated hours", self.estimated_hours.flatten())?;
        require_non_negative("actual hours", self.actual_hours)?;
        require_non_negative("billing rate", self.billing_rate.flatten())
    }
}

// ============================================
// Contact
// ============================================

string_enum! {
    pub enum ContactType {
        Client => "client",
        OpposingCounsel => "opposing_counsel",
        Judge => "judge",
        Expert => "expert",
        Referral => "referral",
        CoCounsel => "co_counsel",
        Other => "other",
    }
}

/// A person involved in the practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub contact_type: ContactType,
    pub first_name: String,
    pub last_name: String,
    /// Firm or organization
    pub organization: Option<String>,
    /// Job title or role within the organization
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    /// Cases this contact is involved in (mirrored by `Case::contact_ids`)
    pub case_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Contact, EntityKind::Contact);

impl Contact {
    /// "First Last", trimmed when either part is empty
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactInput {
    pub contact_type: ContactType,
    pub first_name: String,
    pub last_name: String,
    pub organization: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub case_ids: Vec<String>,
}

impl ContactInput {
    pub fn new(
        contact_type: ContactType,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            contact_type,
            first_name: first_name.into(),
            last_name: last_name.into(),
            organization: None,
            role: None,
            email: None,
            phone: None,
            address: None,
            notes: None,
            case_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(crate::Error::Validation(
                "contact needs a first or last name".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPatch {
    pub contact_type: Option<ContactType>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization: Option<Option<String>>,
    pub role: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub case_ids: Option<Vec<String>>,
}

// ============================================
// Task
// ============================================

string_enum! {
    /// GTD-style workflow state
    pub enum TaskStatus {
        Inbox => "inbox",
        NextAction => "next_action",
        InProgress => "in_progress",
        Done => "done",
    }
}

string_enum! {
    pub enum TaskPriority {
        P1 => "P1",
        P2 => "P2",
        P3 => "P3",
        Deadline => "deadline",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub estimated_minutes: Option<u32>,
    /// Set while `status` is `Done`
    pub completed_at: Option<DateTime<Utc>>,
    /// Cases this task belongs to (mirrored by `Case::task_ids`)
    pub case_ids: Vec<String>,
    pub project_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Task, EntityKind::Task);

#[derive(Debug, Clone, PartialEq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub estimated_minutes: Option<u32>,
    pub case_ids: Vec<String>,
    pub project_ids: Vec<String>,
}

impl TaskInput {
    /// A new P2 task in the inbox
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::Inbox,
            priority: TaskPriority::P2,
            due_date: None,
            scheduled_date: None,
            estimated_minutes: None,
            case_ids: Vec::new(),
            project_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        require_text("task title", &self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub estimated_minutes: Option<Option<u32>>,
    pub case_ids: Option<Vec<String>>,
    pub project_ids: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn validate(&self) -> crate::Result<()> {
        match &self.title {
            Some(title) => require_text("task title", title),
            None => Ok(()),
        }
    }
}

// ============================================
// Project & Goal
// ============================================

string_enum! {
    pub enum ProjectStatus {
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Archived => "archived",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// Goal this project serves
    pub goal_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Project, EntityKind::Project);

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInput {
    pub title: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub goal_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl ProjectInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: ProjectStatus::Active,
            goal_id: None,
            due_date: None,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        require_text("project title", &self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub goal_id: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

string_enum! {
    pub enum GoalHorizon {
        Quarter => "quarter",
        Year => "year",
        LongTerm => "long_term",
    }
}

string_enum! {
    pub enum GoalStatus {
        Active => "active",
        Achieved => "achieved",
        Abandoned => "abandoned",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub horizon: GoalHorizon,
    pub status: GoalStatus,
    pub target_date: Option<NaiveDate>,
    /// Percent complete, 0..=100
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Goal, EntityKind::Goal);

#[derive(Debug, Clone, PartialEq)]
pub struct GoalInput {
    pub title: String,
    pub description: Option<String>,
    pub horizon: GoalHorizon,
    pub status: GoalStatus,
    pub target_date: Option<NaiveDate>,
    pub progress: u8,
}

impl GoalInput {
    pub fn new(title: impl Into<String>, horizon: GoalHorizon) -> Self {
        Self {
            title: title.into(),
            description: None,
            horizon,
            status: GoalStatus::Active,
            target_date: None,
            progress: 0,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        require_text("goal title", &self.title)?;
        require_progress(self.progress)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub horizon: Option<GoalHorizon>,
    pub status: Option<GoalStatus>,
    pub target_date: Option<Option<NaiveDate>>,
    pub progress: Option<u8>,
}

impl GoalPatch {
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(title) = &self.title {
            require_text("goal title", title)?;
        }
        match self.progress {
            Some(progress) => require_progress(progress),
            None => Ok(()),
        }
    }
}

// ============================================
// Work sessions & interactions
// ============================================

/// A block of recorded work time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: String,
    pub case_id: Option<String>,
    pub task_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub billable: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(WorkSession, EntityKind::WorkSession);

impl WorkSession {
    /// Recorded minutes, falling back to the start/end span
    pub fn minutes(&self) -> u32 {
        if let Some(minutes) = self.duration_minutes {
            return minutes;
        }
        self.ended_at
            .map(|end| (end - self.started_at).num_minutes().max(0) as u32)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkSessionInput {
    pub case_id: Option<String>,
    pub task_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub billable: bool,
    pub notes: Option<String>,
}

impl WorkSessionInput {
    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            case_id: None,
            task_id: None,
            started_at,
            ended_at: None,
            duration_minutes: None,
            billable: false,
            notes: None,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if let Some(end) = self.ended_at {
            if end < self.started_at {
                return Err(crate::Error::Validation(
                    "work session ends before it starts".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkSessionPatch {
    pub case_id: Option<Option<String>>,
    pub task_id: Option<Option<String>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<Option<DateTime<Utc>>>,
    pub duration_minutes: Option<Option<u32>>,
    pub billable: Option<bool>,
    pub notes: Option<Option<String>>,
}

string_enum! {
    pub enum InteractionKind {
        Call => "call",
        Email => "email",
        Meeting => "meeting",
        Letter => "letter",
        CourtAppearance => "court_appearance",
        Other => "other",
    }
}

/// A logged exchange with a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInteraction {
    pub id: String,
    pub contact_id: String,
    pub case_id: Option<String>,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
    pub summary: String,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(ContactInteraction, EntityKind::ContactInteraction);

#[derive(Debug, Clone, PartialEq)]
pub struct ContactInteractionInput {
    pub contact_id: String,
    pub case_id: Option<String>,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
    pub summary: String,
    pub follow_up_date: Option<NaiveDate>,
}

impl ContactInteractionInput {
    pub fn validate(&self) -> crate::Result<()> {
        require_text("interaction summary", &self.summary)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactInteractionPatch {
    pub case_id: Option<Option<String>>,
    pub kind: Option<InteractionKind>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub follow_up_date: Option<Option<NaiveDate>>,
}

// ============================================
// Onboarding
// ============================================

/// First-run flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingState {
    pub first_run: bool,
    pub completed: bool,
    pub skipped: bool,
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self {
            first_run: true,
            completed: false,
            skipped: false,
        }
    }
}

impl OnboardingState {
    /// True until the flow is either completed or skipped
    pub fn should_show(&self) -> bool {
        self.first_run && !self.completed && !self.skipped
    }
}

// ============================================
// Validation helpers
// ============================================

fn require_text(field: &str, value: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Option<f64>) -> crate::Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(crate::Error::Validation(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn require_progress(progress: u8) -> crate::Result<()> {
    if progress > 100 {
        return Err(crate::Error::Validation(format!(
            "goal progress must be between 0 and 100, got {progress}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_str() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), *status);
        }
        assert_eq!("P1".parse::<TaskPriority>().unwrap(), TaskPriority::P1);
        assert!("p1".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_enum_serde_names() {
        let json = serde_json::to_string(&ContactType::OpposingCounsel).unwrap();
        assert_eq!(json, "\"opposing_counsel\"");
        let json = serde_json::to_string(&CaseStatus::OnHold).unwrap();
        assert_eq!(json, "\"on_hold\"");
    }

    #[test]
    fn test_validation_rejects_blank_titles() {
        assert!(CaseInput::new("  ", "Acme").validate().is_err());
        assert!(CaseInput::new("Acme v. Smith", "Acme").validate().is_ok());
        assert!(TaskInput::new("").validate().is_err());

        let mut goal = GoalInput::new("Make partner", GoalHorizon::LongTerm);
        goal.progress = 101;
        assert!(goal.validate().is_err());
    }

    #[test]
    fn test_case_rejects_negative_rate() {
        let mut input = CaseInput::new("Acme v. Smith", "Acme");
        input.billing_rate = Some(-1.0);
        assert!(matches!(
            input.validate(),
            Err(crate::Error::Validation(_))
        ));
    }

    #[test]
    fn test_work_session_minutes_fallback() {
        let start = Utc::now();
        let mut session = WorkSession {
            id: "s1".to_string(),
            case_id: None,
            task_id: None,
            started_at: start,
            ended_at: Some(start + chrono::Duration::minutes(90)),
            duration_minutes: None,
            billable: true,
            notes: None,
            created_at: start,
            updated_at: start,
        };
        assert_eq!(session.minutes(), 90);

        session.duration_minutes = Some(30);
        assert_eq!(session.minutes(), 30);
    }

    #[test]
    fn test_onboarding_default_shows() {
        let state = OnboardingState::default();
        assert!(state.should_show());

        let skipped = OnboardingState {
            skipped: true,
            ..state
        };
        assert!(!skipped.should_show());
    }
}
