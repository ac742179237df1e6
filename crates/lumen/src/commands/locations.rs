//! Location command handlers.

use tabled::Tabled;

use lumen_core::{Location, NewLocation, Rename, Session};

use crate::cli::{GlobalOpts, LocationsArgs, LocationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Devices")]
    devices: usize,
}

impl From<&Location> for LocationRow {
    fn from(l: &Location) -> Self {
        Self {
            id: l.location_id.to_string(),
            name: l.location_name.clone(),
            description: util::or_dash(&l.location_description),
            devices: l.device.len(),
        }
    }
}

fn detail(l: &Location) -> String {
    let mut lines = vec![
        format!("ID:          {}", l.location_id),
        format!("Name:        {}", l.location_name),
        format!("Description: {}", util::or_dash(&l.location_description)),
    ];
    for device in &l.device {
        lines.push(format!(
            "Device:      {} ({})",
            device.device_name, device.device_id
        ));
    }
    lines.join("\n")
}

fn print_location(location: &Location, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, location, detail, |l| {
        l.location_id.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: LocationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = session.store();
    match args.command {
        LocationsCommand::List { at } => {
            let locations = store.locations(&at.path())?;
            let out = output::render_list(
                &global.output,
                &locations,
                |l| LocationRow::from(l),
                |l| l.location_id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocationsCommand::Create {
            at,
            name,
            description,
            default_device,
        } => {
            let location = store
                .create_location(
                    &at.path(),
                    NewLocation {
                        name,
                        description,
                        create_default_device: default_device,
                    },
                )
                .await?;
            if location.device.is_empty() && !global.quiet {
                eprintln!(
                    "note: locations without devices are dropped from the hierarchy; \
                     add a device to keep '{}'",
                    location.location_name
                );
            }
            print_location(&location, global)
        }

        LocationsCommand::Update {
            at,
            name,
            description,
        } => {
            let location = store
                .update_location(&at.path(), Rename { name, description })
                .await?;
            print_location(&location, global)
        }

        LocationsCommand::Delete { at } => {
            let path = at.path();
            if !util::confirm(
                &format!("Delete location {path} and its devices?"),
                global.yes,
            )? {
                return Ok(());
            }
            let removed = store.delete_location(&path).await?;
            if !global.quiet {
                eprintln!("✓ Deleted location '{}'", removed.location_name);
            }
            Ok(())
        }
    }
}
