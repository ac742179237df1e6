//! Device command handlers: hierarchy edits and live control.

use serde::Serialize;
use tabled::Tabled;

use lumen_core::{
    CoreError, Device, DevicePath, DeviceUpdate, DeviceView, GroupPath, LocationPath, MoveTarget,
    NewDevice, Rgbw, Session,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, PowerState};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

/// A device together with where it lives.
#[derive(Serialize)]
struct DeviceEntry {
    path: DevicePath,
    #[serde(flatten)]
    device: Device,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
}

impl From<&DeviceEntry> for DeviceRow {
    fn from(e: &DeviceEntry) -> Self {
        let d = &e.device;
        Self {
            path: e.path.to_string(),
            name: d.device_name.clone(),
            ip: d.device_ip.clone().unwrap_or_else(|| "-".into()),
            mac: d
                .device_mac
                .as_ref()
                .map_or_else(|| "-".into(), ToString::to_string),
            hostname: d.device_hostname.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

fn detail(d: &Device) -> String {
    let mut lines = vec![
        format!("ID:          {}", d.device_id),
        format!("Name:        {}", d.device_name),
        format!("Description: {}", util::or_dash(&d.device_description)),
        format!("IP:          {}", d.device_ip.as_deref().unwrap_or("-")),
        format!(
            "MAC:         {}",
            d.device_mac
                .as_ref()
                .map_or_else(|| "-".into(), ToString::to_string)
        ),
        format!("Hostname:    {}", d.device_hostname.as_deref().unwrap_or("-")),
    ];
    if let Some(color) = &d.device_current_color {
        lines.push(format!("Color:       {color}"));
    }
    lines.join("\n")
}

fn print_device(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, device, detail, |d| d.device_id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[derive(Serialize)]
struct DeviceStatus<'a> {
    device_id: &'a str,
    #[serde(flatten)]
    view: &'a DeviceView,
}

fn print_view(device_id: &str, view: &DeviceView, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let status = DeviceStatus { device_id, view };
    let out = output::render_single(
        &global.output,
        &status,
        |s| {
            let mut lines = vec![
                format!("Device:     {}", s.device_id),
                format!("Power:      {}", output::power_label(s.view.on, color)),
                format!(
                    "Brightness: {}",
                    s.view
                        .brightness
                        .map_or_else(|| "-".into(), |b| b.to_string())
                ),
            ];
            if let Some(status) = &s.view.status {
                lines.push(format!("Status:     {status}"));
            }
            lines.join("\n")
        },
        |s| if s.view.on { "on".into() } else { "off".into() },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    session: &Session,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = session.store();
    match args.command {
        DevicesCommand::List {
            zone,
            group,
            location,
        } => {
            let entries: Vec<DeviceEntry> = match (zone, group, location) {
                (Some(z), Some(g), Some(l)) => {
                    let path = LocationPath::new(z, g, l);
                    store
                        .devices(&path)?
                        .into_iter()
                        .map(|device| DeviceEntry {
                            path: path.device(device.device_id.clone()),
                            device,
                        })
                        .collect()
                }
                _ => store
                    .all_devices()
                    .into_iter()
                    .map(|(path, device)| DeviceEntry { path, device })
                    .collect(),
            };
            let out = output::render_list(
                &global.output,
                &entries,
                |e| DeviceRow::from(e),
                |e| e.path.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Create { at, name, fields } => {
            let device = store
                .create_device(
                    &at.path(),
                    NewDevice {
                        name,
                        description: fields.description.unwrap_or_default(),
                        ip: fields.ip,
                        mac: fields.mac,
                        hostname: fields.hostname,
                        ..NewDevice::default()
                    },
                )
                .await?;
            print_device(&device, global)
        }

        DevicesCommand::Update {
            at,
            device,
            name,
            fields,
        } => {
            let updated = store
                .update_device(
                    &at.path().device(device),
                    DeviceUpdate {
                        name,
                        description: fields.description,
                        ip: fields.ip,
                        mac: fields.mac,
                        hostname: fields.hostname,
                        current_color: None,
                    },
                )
                .await?;
            print_device(&updated, global)
        }

        DevicesCommand::Delete { at, device } => {
            let path = at.path().device(device);
            if !util::confirm(&format!("Remove device {path}?"), global.yes)? {
                return Ok(());
            }
            let removed = store.delete_device(&path).await?;
            if !global.quiet {
                eprintln!("✓ Removed device '{}'", removed.device_name);
            }
            Ok(())
        }

        DevicesCommand::Move {
            at,
            device,
            to_zone,
            to_group,
            to_location,
            new_location,
        } => {
            let from = at.path().device(device);
            let zone = to_zone.unwrap_or_else(|| at.zone.clone());
            let group = to_group.unwrap_or_else(|| at.group.clone());
            let target = match (new_location, to_location) {
                (Some(name), _) => MoveTarget::NewLocation {
                    group: GroupPath::new(zone, group),
                    name,
                    description: String::new(),
                },
                (None, Some(location)) => {
                    MoveTarget::Existing(LocationPath::new(zone, group, location))
                }
                (None, None) => {
                    return Err(CliError::Validation {
                        field: "destination".into(),
                        reason: "pass --to-location or --new-location".into(),
                    });
                }
            };
            let moved = store.move_device(&from, target).await?;
            let out = output::render_single(
                &global.output,
                &moved,
                |p| format!("✓ Moved {from} → {p}"),
                ToString::to_string,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Live control ────────────────────────────────────────────
        DevicesCommand::Power { device, state } => {
            let devices = session.devices();
            let on = match state {
                PowerState::On => {
                    devices.set_power(&device, true).await?;
                    true
                }
                PowerState::Off => {
                    devices.set_power(&device, false).await?;
                    false
                }
                PowerState::Toggle => {
                    // Toggling needs to know where we start from.
                    devices.refresh(&device).await?;
                    devices.toggle_power(&device).await?
                }
            };
            let view = devices.view(&device).unwrap_or(DeviceView {
                on,
                ..DeviceView::default()
            });
            print_view(&device, &view, global)
        }

        DevicesCommand::Color { device, r, g, b, w } => {
            session
                .client()
                .set_color(
                    &device,
                    Rgbw { r, g, b, w },
                    session.config().control_policy(),
                )
                .await
                .map_err(CoreError::from)?;
            if !global.quiet {
                eprintln!("✓ Color of device {device} set to ({r}, {g}, {b})");
            }
            Ok(())
        }

        DevicesCommand::Brightness { device, value } => {
            session
                .client()
                .set_brightness(&device, value, session.config().control_policy())
                .await
                .map_err(CoreError::from)?;
            if !global.quiet {
                eprintln!("✓ Brightness of device {device} set to {value}");
            }
            Ok(())
        }

        DevicesCommand::Effect { device, effect_id } => {
            session.devices().set_effect(&device, effect_id).await?;
            if !global.quiet {
                eprintln!("✓ Effect {effect_id} started on device {device}");
            }
            Ok(())
        }

        DevicesCommand::State { device } => {
            let view = session.devices().refresh(&device).await?;
            print_view(&device, &view, global)
        }

        DevicesCommand::Ping { device } => {
            let reachable = session.ping(&device).await?;
            let out = output::render_single(
                &global.output,
                &reachable,
                |r| {
                    if *r {
                        format!("device {device} is reachable")
                    } else {
                        format!("device {device} did not answer")
                    }
                },
                ToString::to_string,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
