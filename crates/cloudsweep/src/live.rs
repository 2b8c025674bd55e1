//! Live progress lines on stderr, one per resource outcome.

use cloudsweep_core::{ClassSummary, OutcomeStatus, ProgressEvent, ProgressObserver};

use crate::color;

#[derive(Debug, Default)]
pub struct LiveProgress;

impl LiveProgress {
    pub fn new() -> Self {
        Self
    }
}

pub fn event_line(event: &ProgressEvent) -> String {
    let id = match &event.parent_id {
        Some(parent) => format!("{} (in {})", event.resource_id, parent),
        None => event.resource_id.clone(),
    };
    let mut line = format!(
        "  {:<22} {:<16} {}",
        event.status.as_str(),
        event.class.as_str(),
        id
    );
    if let Some(error) = &event.error
        && event.status != OutcomeStatus::Planned
    {
        line.push_str(&format!(" ({})", error));
    }
    line
}

pub fn class_line(summary: &ClassSummary) -> String {
    if let Some(error) = &summary.discovery_error {
        return format!("{}: discovery failed: {}", summary.class, error);
    }
    if let Some(reason) = &summary.blocked_reason {
        return format!("{}: blocked ({})", summary.class, reason);
    }
    let done = if summary.dry_run {
        format!("{} planned", summary.planned)
    } else {
        format!("{} deleted", summary.deleted)
    };
    let mut line = format!(
        "{}: {} scanned, {} eligible, {}, {} failed",
        summary.class, summary.scanned, summary.eligible, done, summary.failed
    );
    if summary.cancelled {
        line.push_str(", cancelled");
    }
    line
}

impl ProgressObserver for LiveProgress {
    fn on_event(&self, event: &ProgressEvent) {
        let line = event_line(event);
        let status = event.status.as_str();
        eprintln!("{}", line.replacen(status, &color::outcome_stderr(status), 1));
    }

    fn on_class_finished(&self, summary: &ClassSummary) {
        let line = class_line(summary);
        if summary.has_failures() || summary.blocked {
            eprintln!("{}", color::warning(&line));
        } else {
            eprintln!("{}", color::hint(&line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsweep_config::ResourceClass;

    fn event(status: OutcomeStatus, parent: Option<&str>, error: Option<&str>) -> ProgressEvent {
        ProgressEvent {
            resource_id: "tmp/a.log".to_string(),
            class: ResourceClass::S3Bucket,
            parent_id: parent.map(str::to_string),
            status,
            error: error.map(str::to_string),
            dry_run: false,
        }
    }

    #[test]
    fn test_event_line_includes_parent_and_error() {
        let line = event_line(&event(
            OutcomeStatus::Failed,
            Some("tmp"),
            Some("permission_denied: no"),
        ));
        assert!(line.starts_with("  failed"));
        assert!(line.contains("s3_bucket"));
        assert!(line.ends_with("tmp/a.log (in tmp) (permission_denied: no)"));
    }

    #[test]
    fn test_event_line_without_parent() {
        let line = event_line(&event(OutcomeStatus::Deleted, None, None));
        assert!(line.ends_with("tmp/a.log"));
    }
}
