//! Discover command: scan, select, and optionally commit into a group.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::ProgressBar;
use tabled::Tabled;

use lumen_core::discovery::{Candidate, Committed};
use lumen_core::{GroupPath, Session};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Probe")]
    probe: String,
    #[tabled(rename = "Selected")]
    selected: String,
}

impl From<&Candidate> for CandidateRow {
    fn from(c: &Candidate) -> Self {
        Self {
            address: c.address.clone(),
            name: c.display_name(),
            mac: c.mac().map_or_else(|| "-".into(), |m| m.to_string()),
            probe: c.enrichment.to_string(),
            selected: if c.selected { "yes".into() } else { String::new() },
        }
    }
}

#[derive(Tabled)]
struct CommittedRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&Committed> for CommittedRow {
    fn from(c: &Committed) -> Self {
        Self {
            address: c.address.clone(),
            name: c.name.clone(),
            route: c.route.to_string(),
            location: c
                .location
                .as_ref()
                .map_or_else(|| "(server default)".into(), ToString::to_string),
        }
    }
}

fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner().with_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: DiscoverArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let discovery = session.discovery();

    let bar = spinner(global, &format!("Scanning {}", args.target));
    let scanned = discovery.scan(&args.target).await;
    let enrichment = match scanned {
        Ok(handle) => handle,
        Err(e) => {
            if let Some(bar) = &bar {
                bar.finish_and_clear();
            }
            return Err(e.into());
        }
    };
    if let Some(bar) = &bar {
        bar.set_message(format!("Probing {} device(s)", enrichment.len()));
    }
    enrichment.wait().await;
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    if args.all {
        discovery.select_all(true)?;
    }
    for address in &args.select {
        discovery.set_selected(address, true)?;
    }

    if !args.commit {
        let candidates = discovery.candidates();
        if candidates.is_empty() && !global.quiet {
            eprintln!("No devices found for {}", args.target);
        }
        let out = output::render_list(
            &global.output,
            &candidates,
            |c| CandidateRow::from(c),
            |c| c.address.clone(),
        )?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let (Some(zone), Some(group)) = (args.zone, args.group) else {
        return Err(CliError::Validation {
            field: "group".into(),
            reason: "--commit needs --zone and --group".into(),
        });
    };
    let target = GroupPath::new(zone, group);

    let bar = spinner(global, &format!("Adding devices to {target}"));
    let committed = discovery.commit(&target).await;
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let report = committed?;

    for failure in &report.failed {
        eprintln!("✗ {}: {}", failure.address, failure.error);
    }
    let out = output::render_list(
        &global.output,
        &report.committed,
        |c| CommittedRow::from(c),
        |c| c.address.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if report.committed.is_empty() {
        return Err(CliError::ApiError {
            code: "discovery".into(),
            message: format!("none of {} selected device(s) could be added", report.failed.len()),
        });
    }
    Ok(())
}
