//! One-line summaries for session activities.

use crate::data::Activity;

/// Derive the notification body for an activity.
///
/// Evaluated in fixed priority order, first match wins; an activity missing
/// every expected field falls through to the generic fallback rather than
/// erroring.
pub fn summarize(activity: &Activity) -> String {
    if let Some(progress) = &activity.progress_updated {
        if let Some(title) = non_empty(progress.title.as_deref()) {
            return title.to_string();
        }
        if let Some(description) = non_empty(progress.description.as_deref()) {
            return description.to_string();
        }
    }

    if activity.session_completed.is_some() {
        return "Session completed".to_string();
    }

    if let Some(plan) = &activity.plan_generated {
        if !plan.steps.is_empty() {
            return format!("Generated a plan with {} steps", plan.steps.len());
        }
    }

    if activity.plan_approved.is_some() {
        return "Plan approved".to_string();
    }

    if let Some(artifacts) = &activity.artifacts {
        if let Some(first) = artifacts.first() {
            if let Some(message) = non_empty(first.suggested_commit_message.as_deref()) {
                return message.to_string();
            }
        }
    }

    "New activity".to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
