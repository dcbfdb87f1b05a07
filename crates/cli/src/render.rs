//! Terminal rendering of watch activity

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use quiesce_core::PolicyOutcome;
use std::time::SystemTime;
use tokio::sync::mpsc;
use watcher::Activity;

/// Wall-clock time as `HH:MM:SS.mmm`
pub fn clock(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%H:%M:%S%.3f").to_string()
}

/// One plain-text line describing `activity`
pub fn render(activity: &Activity) -> String {
    match activity {
        Activity::Ready { .. } => "ready; press ^C to exit".to_string(),
        Activity::Observed { seq, event } => format!("{:>3} {}", seq, event),
        Activity::SourceError { message } => format!("ERROR: {}", message),
        Activity::PassStarted { queued } => format!("purge pass: {} queued", queued),
        Activity::Decision {
            path,
            observed_at,
            outcome,
        } => {
            let verdict = match outcome {
                PolicyOutcome::Allow => "allow".to_string(),
                PolicyOutcome::Deny => "deny".to_string(),
                PolicyOutcome::Error(e) => format!("deny ({})", e),
            };
            format!(
                "decision: {} observed {} -> {}",
                path.display(),
                clock(*observed_at),
                verdict
            )
        }
        Activity::Removed { path, observed_at } => {
            format!("removing {} (observed {})", path.display(), clock(*observed_at))
        }
        Activity::Requeued {
            path,
            observed_at,
            requeued_at,
        } => format!(
            "file modified, putting it back: {} (observed {}, requeued {})",
            path.display(),
            clock(*observed_at),
            clock(*requeued_at)
        ),
        Activity::Vanished { path } => format!("already gone: {}", path.display()),
        Activity::Failed { path, message } => {
            format!("failed: {}: {}", path.display(), message)
        }
    }
}

/// Print activity as it arrives, until every reporter is dropped
pub async fn print_activity(mut rx: mpsc::UnboundedReceiver<Activity>) {
    while let Some(activity) = rx.recv().await {
        let stamp = clock(SystemTime::now());
        let line = render(&activity);

        match &activity {
            Activity::SourceError { .. } | Activity::Failed { .. } => {
                println!("{} {}", stamp.dimmed(), line.red())
            }
            Activity::Removed { .. } => println!("{} {}", stamp.dimmed(), line.green()),
            Activity::Requeued { .. } => println!("{} {}", stamp.dimmed(), line.yellow()),
            Activity::Ready { .. } => println!("{} {}", stamp.dimmed(), line.bold()),
            _ => println!("{} {}", stamp.dimmed(), line),
        }
    }
}
