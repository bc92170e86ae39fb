use serde::{Deserialize, Serialize};

/// A connected code repository the agent can operate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Resource name, e.g. "sources/github/acme/boba-app"
    pub name: String,
    #[serde(default)]
    pub id: String,
    pub github_repo: Option<GitHubRepo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl Source {
    /// Human-readable name: "owner/repo" when known, otherwise the short id
    /// or the trailing segment of the resource name.
    pub fn display_name(&self) -> String {
        if let Some(repo) = &self.github_repo {
            return format!("{}/{}", repo.owner, repo.repo);
        }
        if !self.id.is_empty() {
            return self.id.clone();
        }
        self.name
            .rsplit('/')
            .next()
            .unwrap_or(&self.name)
            .to_string()
    }
}

/// A unit of agent work against a Source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Resource name, e.g. "sessions/31337"
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub prompt: Option<String>,
    pub source_context: Option<SourceContext>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
    #[serde(default)]
    pub state: SessionState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    /// Resource name of the source this session runs against.
    pub source: String,
    pub github_repo_context: Option<GitHubRepoContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubRepoContext {
    pub starting_branch: Option<String>,
}

impl Session {
    /// Short identifier, falling back to the trailing resource-name segment.
    pub fn short_id(&self) -> &str {
        if !self.id.is_empty() {
            return &self.id;
        }
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Resource name of the source this session belongs to, if known.
    pub fn source_name(&self) -> Option<&str> {
        self.source_context.as_ref().map(|c| c.source.as_str())
    }

    /// Display title, falling back to the prompt or the id.
    pub fn display_title(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        if let Some(prompt) = &self.prompt {
            if !prompt.is_empty() {
                return prompt.clone();
            }
        }
        self.short_id().to_string()
    }
}

/// Session lifecycle state as reported by the service.
///
/// `Unknown` absorbs states added server-side after this client shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Queued,
    Planning,
    AwaitingPlanApproval,
    InProgress,
    Paused,
    Failed,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Planning => "Planning",
            Self::AwaitingPlanApproval => "Awaiting approval",
            Self::InProgress => "In progress",
            Self::Paused => "Paused",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the session can still produce new activities.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Failed | Self::Completed)
    }
}

/// One event in a session's timeline.
///
/// An activity carries at most one of the kind-specific payloads below.
/// When none is present it is a generic activity whose only guaranteed
/// field is the resource `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Resource name, e.g. "sessions/31337/activities/42"
    pub name: String,
    #[serde(default)]
    pub id: String,
    /// ISO-8601 timestamp; absent means "unknown time".
    pub create_time: Option<String>,
    /// Who produced the activity ("user" or an agent-side label).
    pub originator: Option<String>,

    pub progress_updated: Option<ProgressUpdated>,
    pub session_completed: Option<SessionCompleted>,
    pub plan_generated: Option<PlanGenerated>,
    pub plan_approved: Option<PlanApproved>,
    pub artifacts: Option<Vec<Artifact>>,
    pub agent_messaged: Option<AgentMessaged>,
    pub user_messaged: Option<UserMessaged>,
}

impl Activity {
    /// Stable identifier used for change detection and notification dedup.
    /// Falls back to the resource name for entries without a short id.
    pub fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    /// Whether this activity was authored by the user.
    ///
    /// Case-insensitive comparison; an absent originator counts as not-user,
    /// so agent activities with unknown origin still notify.
    pub fn is_user(&self) -> bool {
        self.originator
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case("user"))
    }

    /// Chat message text for message-type activities.
    pub fn message_text(&self) -> Option<&str> {
        if let Some(m) = &self.user_messaged {
            return m.message.as_deref();
        }
        if let Some(m) = &self.agent_messaged {
            return m.message.as_deref();
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdated {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Marker payload, no fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCompleted {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanGenerated {
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub index: Option<u32>,
    pub title: Option<String>,
}

/// Marker payload, no fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanApproved {}

/// A code-change artifact produced by the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub suggested_commit_message: Option<String>,
    /// Unified diff text.
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessaged {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessaged {
    pub message: Option<String>,
}

/// Per-session record of what the background monitor is watching.
///
/// Owned by the watchlist store; the monitor reads and advances
/// `last_seen_activity_id` but does not own the storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedSession {
    pub session_id: String,
    pub title: String,
    pub last_seen_activity_id: Option<String>,
}
