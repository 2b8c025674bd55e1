//! Interactive per-resource confirmation on stdin.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

use cloudsweep_core::{Approver, DeletionUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Approve this and every remaining resource.
    All,
    /// Reject this and every remaining resource.
    Quit,
}

pub fn parse_answer(input: &str) -> Answer {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Answer::Yes,
        "a" | "all" => Answer::All,
        "q" | "quit" => Answer::Quit,
        _ => Answer::No,
    }
}

/// Prompt for one deletion unit. A parent that stays in place is named as
/// the container, not as a deletion target.
pub fn prompt_text(unit: &DeletionUnit) -> String {
    let resource = &unit.resource;
    let target = format!("{} '{}'", resource.class, resource.id);
    let children = unit.children.len();
    let entries = resource.class.child_noun().map(|noun| {
        format!(
            "{} {}{}",
            children,
            noun,
            if children == 1 { "" } else { "s" }
        )
    });
    match entries {
        Some(entries) if children > 0 && unit.removes_parent() => {
            format!("Delete {} and {}? [y/N/a/q] ", target, entries)
        }
        Some(entries) if children > 0 => {
            format!("Delete {} from {} (kept)? [y/N/a/q] ", entries, target)
        }
        _ => format!("Delete {}? [y/N/a/q] ", target),
    }
}

struct PromptState {
    lines: Lines<BufReader<Stdin>>,
    /// Set once the operator answers "all" or "quit", or stdin closes.
    sticky: Option<bool>,
}

pub struct StdinApprover {
    state: Mutex<PromptState>,
}

impl StdinApprover {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PromptState {
                lines: BufReader::new(tokio::io::stdin()).lines(),
                sticky: None,
            }),
        }
    }
}

impl Default for StdinApprover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Approver for StdinApprover {
    async fn approve(&self, unit: &DeletionUnit) -> bool {
        let mut state = self.state.lock().await;
        if let Some(answer) = state.sticky {
            return answer;
        }

        eprint!("{}", prompt_text(unit));
        let _ = std::io::stderr().flush();

        let answer = match state.lines.next_line().await {
            Ok(Some(line)) => parse_answer(&line),
            Ok(None) => Answer::Quit,
            Err(e) => {
                warn!(event = "cli.approval_read_failed", error = %e);
                Answer::Quit
            }
        };
        match answer {
            Answer::Yes => true,
            Answer::No => false,
            Answer::All => {
                state.sticky = Some(true);
                true
            }
            Answer::Quit => {
                state.sticky = Some(false);
                false
            }
        }
    }
}
