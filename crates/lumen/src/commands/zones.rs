//! Zone command handlers.

use tabled::Tabled;

use lumen_core::{Rename, Session, Zone};

use crate::cli::{GlobalOpts, ZonesArgs, ZonesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Groups")]
    groups: usize,
}

impl From<&Zone> for ZoneRow {
    fn from(z: &Zone) -> Self {
        Self {
            id: z.zone_id.to_string(),
            name: z.zone_name.clone(),
            description: util::or_dash(&z.zone_description),
            groups: z.groups.len(),
        }
    }
}

fn detail(z: &Zone) -> String {
    [
        format!("ID:          {}", z.zone_id),
        format!("Name:        {}", z.zone_name),
        format!("Description: {}", util::or_dash(&z.zone_description)),
        format!("Groups:      {}", z.groups.len()),
    ]
    .join("\n")
}

fn print_zone(zone: &Zone, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, zone, detail, |z| z.zone_id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: ZonesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = session.store();
    match args.command {
        ZonesCommand::List => {
            let zones = store.zones();
            let out = output::render_list(
                &global.output,
                &zones,
                |z| ZoneRow::from(z),
                |z| z.zone_id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ZonesCommand::Create { name, description } => {
            let zone = store.create_zone(&name, &description).await?;
            print_zone(&zone, global)
        }

        ZonesCommand::Update {
            zone,
            name,
            description,
        } => {
            let zone = store
                .update_zone(&zone, Rename { name, description })
                .await?;
            print_zone(&zone, global)
        }

        ZonesCommand::Delete { zone } => {
            let label = store
                .snapshot()
                .zone(&zone)
                .map_or_else(|| zone.to_string(), |z| z.zone_name.clone());
            if !util::confirm(&format!("Delete zone '{label}' and everything in it?"), global.yes)? {
                return Ok(());
            }
            let removed = store.delete_zone(&zone).await?;
            if !global.quiet {
                eprintln!("✓ Deleted zone '{}'", removed.zone_name);
            }
            Ok(())
        }
    }
}
