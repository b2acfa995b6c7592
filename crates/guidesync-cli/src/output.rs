//! Plain-text rendering for command results.

use guidesync_core::{Guide, PendingSyncAction, Session, SyncReport, WriteOutcome};

pub fn print_guides(guides: &[Guide], cached_age: Option<&str>) {
    if guides.is_empty() {
        println!("No guides");
        return;
    }
    for guide in guides {
        let star = if guide.favorite { "*" } else { " " };
        println!(
            "{} {:>5}  {}  ({} day{})",
            star,
            guide.id,
            guide.title,
            guide.days,
            if guide.days == 1 { "" } else { "s" }
        );
    }
    if let Some(age) = cached_age {
        println!("\nCached {}", age);
    }
}

pub fn print_guide(guide: &Guide, day: u32) {
    println!("{}{}", guide.title, if guide.favorite { " *" } else { "" });
    if !guide.description.is_empty() {
        println!("{}", guide.description);
    }
    if !guide.seasons.is_empty() {
        println!("Seasons: {}", guide.seasons.join(", "));
    }
    if !guide.mobilities.is_empty() {
        println!("Getting around: {}", guide.mobilities.join(", "));
    }
    if !guide.audience.is_empty() {
        println!("For: {}", guide.audience.join(", "));
    }

    let days: Vec<u32> = if day == 0 { guide.day_list() } else { vec![day] };
    for d in days {
        println!("\nDay {}", d);
        let activities = guide.activities_for_day(d);
        if activities.is_empty() {
            println!("  (nothing planned)");
        }
        for placed in activities {
            match &placed.activite {
                Some(activity) => {
                    println!("  {}. {}", placed.order, activity.title);
                    if let Some(ref address) = activity.address {
                        println!("     {}", address);
                    }
                    if let Some(ref hours) = activity.opening_hours {
                        println!("     {}", hours);
                    }
                }
                None => println!("  {}. activity #{}", placed.order, placed.activite_id),
            }
        }
    }
}

pub fn print_write(what: &str, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Applied => println!("{}", what),
        WriteOutcome::Queued { action_id } => {
            println!("{} - queued for sync ({})", what, action_id)
        }
    }
}

pub fn print_report(report: &SyncReport) {
    println!(
        "Synced {}/{} queued edit(s), {} still pending",
        report.succeeded, report.attempted, report.retained
    );
    for action in &report.expired {
        println!(
            "Lost: {} {} (queued {})",
            action.kind,
            action.endpoint,
            action.enqueued_at.format("%Y-%m-%d %H:%M")
        );
    }
    for error in &report.errors {
        eprintln!("  {}", error);
    }
}

/// Sync history is per process, so only state that outlives a run is shown.
pub fn print_status(online: bool, pending: usize, session: &Session) {
    for line in status_lines(online, pending, session) {
        println!("{}", line);
    }
}

fn status_lines(online: bool, pending: usize, session: &Session) -> Vec<String> {
    let signed_in = match session.data() {
        Some(data) if !data.is_expired() => format!(
            "{} ({} min left)",
            data.principal_id,
            data.minutes_until_expiry()
        ),
        Some(_) => "session expired".to_string(),
        None => "no".to_string(),
    };
    vec![
        format!("Connection: {}", if online { "online" } else { "offline" }),
        format!("Signed in:  {}", signed_in),
        format!("Pending:    {}", pending),
    ]
}

pub fn print_pending(actions: &[PendingSyncAction]) {
    if actions.is_empty() {
        println!("Nothing queued");
        return;
    }
    for action in actions {
        println!(
            "{}  {:<6} {}  {}",
            action.enqueued_at.format("%Y-%m-%d %H:%M"),
            action.kind.to_string(),
            action.endpoint,
            action.id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_lines_show_only_persisted_state() {
        let session = Session::new(PathBuf::from("unused"));
        assert_eq!(
            status_lines(false, 3, &session),
            vec!["Connection: offline", "Signed in:  no", "Pending:    3"]
        );
    }
}
