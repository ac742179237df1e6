//! Group command handlers.

use tabled::Tabled;

use lumen_core::{Group, GroupPath, Rename, Session};

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Locations")]
    locations: usize,
}

impl From<&Group> for GroupRow {
    fn from(g: &Group) -> Self {
        Self {
            id: g.group_id.to_string(),
            name: g.group_name.clone(),
            description: util::or_dash(&g.group_description),
            locations: g.location.len(),
        }
    }
}

fn detail(g: &Group) -> String {
    [
        format!("ID:          {}", g.group_id),
        format!("Name:        {}", g.group_name),
        format!("Description: {}", util::or_dash(&g.group_description)),
        format!("Locations:   {}", g.location.len()),
    ]
    .join("\n")
}

fn print_group(group: &Group, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, group, detail, |g| g.group_id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: GroupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = session.store();
    match args.command {
        GroupsCommand::List { zone, remote } => {
            let groups = if remote {
                store.fetch_groups(&zone).await?
            } else {
                store.groups(&zone)?
            };
            let out = output::render_list(
                &global.output,
                &groups,
                |g| GroupRow::from(g),
                |g| g.group_id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Create {
            zone,
            name,
            description,
        } => {
            let group = store.create_group(&zone, &name, &description).await?;
            print_group(&group, global)
        }

        GroupsCommand::Update {
            at,
            name,
            description,
        } => {
            let group = store
                .update_group(&at.path(), Rename { name, description })
                .await?;
            print_group(&group, global)
        }

        GroupsCommand::Delete { at } => {
            let path: GroupPath = at.path();
            if !util::confirm(
                &format!("Delete group {path} and everything in it?"),
                global.yes,
            )? {
                return Ok(());
            }
            let removed = store.delete_group(&path).await?;
            if !global.quiet {
                eprintln!("✓ Deleted group '{}'", removed.group_name);
            }
            Ok(())
        }
    }
}
