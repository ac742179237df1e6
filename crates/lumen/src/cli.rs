//! Clap derive structures for the `lumen` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use lumen_core::{EntityId, GroupPath, LocationPath, MacAddress};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lumen -- organize and control networked lighting controllers
#[derive(Debug, Parser)]
#[command(
    name = "lumen",
    version,
    about = "Organize and control networked lighting devices from the command line",
    long_about = "Manage the Zone / Group / Location / Device hierarchy of a lighting\n\
        controller backend, discover devices on the local network, and drive\n\
        power, color, brightness and effects.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "LUMEN_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 's', env = "LUMEN_SERVER", global = true)]
    pub server: Option<String>,

    /// Per-attempt request timeout in milliseconds (overrides profile)
    #[arg(long, env = "LUMEN_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Retries after a timeout or network failure (overrides profile)
    #[arg(long, env = "LUMEN_RETRIES", global = true)]
    pub retries: Option<u32>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LUMEN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or normalize the whole hierarchy document
    #[command(alias = "tree")]
    Hierarchy(HierarchyArgs),

    /// Manage zones
    #[command(alias = "z")]
    Zones(ZonesArgs),

    /// Manage groups inside a zone
    #[command(alias = "g")]
    Groups(GroupsArgs),

    /// Manage locations inside a group
    #[command(alias = "loc", alias = "l")]
    Locations(LocationsArgs),

    /// Manage and control devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Scan the network for devices and add them to a group
    Discover(DiscoverArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// Whether the handler reads the hierarchy snapshot.
    pub fn needs_hierarchy(&self) -> bool {
        match self {
            Self::Hierarchy(_) | Self::Zones(_) | Self::Locations(_) | Self::Discover(_) => true,
            Self::Groups(args) => !matches!(args.command, GroupsCommand::List { remote: true, .. }),
            Self::Devices(args) => args.command.needs_hierarchy(),
            Self::Config(_) | Self::Completions(_) => false,
        }
    }
}

// ── Shared path arguments ────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct GroupRef {
    /// Zone ID
    #[arg(long, short = 'z')]
    pub zone: EntityId,

    /// Group ID
    #[arg(long, short = 'g')]
    pub group: EntityId,
}

impl GroupRef {
    pub fn path(&self) -> GroupPath {
        GroupPath::new(self.zone.clone(), self.group.clone())
    }
}

#[derive(Debug, Clone, Args)]
pub struct LocationRef {
    /// Zone ID
    #[arg(long, short = 'z')]
    pub zone: EntityId,

    /// Group ID
    #[arg(long, short = 'g')]
    pub group: EntityId,

    /// Location ID
    #[arg(long, short = 'l')]
    pub location: EntityId,
}

impl LocationRef {
    pub fn path(&self) -> LocationPath {
        LocationPath::new(self.zone.clone(), self.group.clone(), self.location.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HIERARCHY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HierarchyArgs {
    #[command(subcommand)]
    pub command: HierarchyCommand,
}

#[derive(Debug, Subcommand)]
pub enum HierarchyCommand {
    /// Show the hierarchy as loaded from the backend
    Show,

    /// Normalize a hierarchy document from a file (offline)
    Normalize {
        /// Path to a JSON document, or "-" for stdin
        file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ZONES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ZonesArgs {
    #[command(subcommand)]
    pub command: ZonesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ZonesCommand {
    /// List zones
    #[command(alias = "ls")]
    List,

    /// Create a zone
    Create {
        /// Zone name (unique, ignoring case)
        name: String,

        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// Rename or re-describe a zone
    Update {
        /// Zone ID
        zone: EntityId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Delete a zone and everything in it
    #[command(alias = "rm")]
    Delete {
        /// Zone ID
        zone: EntityId,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GROUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List groups of a zone
    #[command(alias = "ls")]
    List {
        /// Zone ID
        #[arg(long, short = 'z')]
        zone: EntityId,

        /// Ask the backend's group listing instead of the hierarchy document
        #[arg(long)]
        remote: bool,
    },

    /// Create a group
    Create {
        /// Zone ID
        #[arg(long, short = 'z')]
        zone: EntityId,

        /// Group name
        name: String,

        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// Rename or re-describe a group
    Update {
        #[command(flatten)]
        at: GroupRef,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Delete a group and everything in it
    #[command(alias = "rm")]
    Delete {
        #[command(flatten)]
        at: GroupRef,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOCATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LocationsArgs {
    #[command(subcommand)]
    pub command: LocationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocationsCommand {
    /// List locations of a group
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        at: GroupRef,
    },

    /// Create a location
    Create {
        #[command(flatten)]
        at: GroupRef,

        /// Location name
        name: String,

        #[arg(long, short = 'd', default_value = "")]
        description: String,

        /// Let the backend add a placeholder device
        #[arg(long)]
        default_device: bool,
    },

    /// Rename or re-describe a location
    Update {
        #[command(flatten)]
        at: LocationRef,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Delete a location and its devices
    #[command(alias = "rm")]
    Delete {
        #[command(flatten)]
        at: LocationRef,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

/// Fields shared by device create and update.
#[derive(Debug, Clone, Args)]
pub struct DeviceFields {
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// IPv4 address
    #[arg(long)]
    pub ip: Option<String>,

    /// MAC address (any common notation)
    #[arg(long)]
    pub mac: Option<MacAddress>,

    #[arg(long)]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PowerState {
    On,
    Off,
    Toggle,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices (all, or those of one location)
    #[command(alias = "ls")]
    List {
        #[arg(long, short = 'z', requires_all = ["group", "location"])]
        zone: Option<EntityId>,

        #[arg(long, short = 'g', requires_all = ["zone", "location"])]
        group: Option<EntityId>,

        #[arg(long, short = 'l', requires_all = ["zone", "group"])]
        location: Option<EntityId>,
    },

    /// Add a device to a location
    Create {
        #[command(flatten)]
        at: LocationRef,

        /// Device name
        name: String,

        #[command(flatten)]
        fields: DeviceFields,
    },

    /// Edit a device's metadata
    Update {
        #[command(flatten)]
        at: LocationRef,

        /// Device ID
        device: EntityId,

        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: DeviceFields,
    },

    /// Remove a device (its location goes too if it was the last one)
    #[command(alias = "rm")]
    Delete {
        #[command(flatten)]
        at: LocationRef,

        /// Device ID
        device: EntityId,
    },

    /// Move a device to another location
    #[command(alias = "mv")]
    Move {
        #[command(flatten)]
        at: LocationRef,

        /// Device ID
        device: EntityId,

        /// Destination zone (defaults to the current one)
        #[arg(long)]
        to_zone: Option<EntityId>,

        /// Destination group (defaults to the current one)
        #[arg(long)]
        to_group: Option<EntityId>,

        /// Destination location ID
        #[arg(long, conflicts_with = "new_location", required_unless_present = "new_location")]
        to_location: Option<EntityId>,

        /// Create a new location with this name as the destination
        #[arg(long)]
        new_location: Option<String>,
    },

    /// Switch a device on or off
    Power {
        /// Backend device ID
        device: String,

        #[arg(value_enum)]
        state: PowerState,
    },

    /// Set a device's color
    Color {
        /// Backend device ID
        device: String,

        r: u8,
        g: u8,
        b: u8,

        /// White channel, for RGBW strips
        #[arg(long)]
        w: Option<u8>,
    },

    /// Set a device's brightness (0-255)
    Brightness {
        /// Backend device ID
        device: String,

        value: u8,
    },

    /// Run a firmware effect
    Effect {
        /// Backend device ID
        device: String,

        effect_id: u32,
    },

    /// Show the device-reported state
    State {
        /// Backend device ID
        device: String,
    },

    /// Check whether a device answers
    Ping {
        /// Backend device ID
        device: String,
    },
}

impl DevicesCommand {
    fn needs_hierarchy(&self) -> bool {
        !matches!(
            self,
            Self::Power { .. }
                | Self::Color { .. }
                | Self::Brightness { .. }
                | Self::Effect { .. }
                | Self::State { .. }
                | Self::Ping { .. }
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DISCOVER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Subnet prefix ("192.168.1") or a single address ("192.168.1.50")
    pub target: String,

    /// Select a candidate by address (repeatable)
    #[arg(long = "select", value_name = "ADDR", conflicts_with = "all")]
    pub select: Vec<String>,

    /// Select every candidate
    #[arg(long)]
    pub all: bool,

    /// Zone to add devices to
    #[arg(long, short = 'z', requires = "group")]
    pub zone: Option<EntityId>,

    /// Group to add devices to
    #[arg(long, short = 'g', requires = "zone")]
    pub group: Option<EntityId>,

    /// Add the selected candidates to the group
    #[arg(long, requires = "zone")]
    pub commit: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Point the active profile at a backend URL
    SetServer {
        /// Backend base URL (e.g., "http://192.168.1.10:5000")
        url: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
