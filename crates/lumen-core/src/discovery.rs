// ── Device discovery ──
//
// Scan → select → commit. A scan is one backend call; per-candidate
// probes then run in the background and fill in metadata as they land.
// Commit walks the selected candidates one at a time, resolving (or
// creating) the Location they go into and adding each Device.

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lumen_api::models::{CreateDeviceRequest, LegacyDeviceRequest};
use lumen_api::{ProbeInfo, RequestPolicy, ResilientClient};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{GroupPath, LocationPath, MacAddress};
use crate::store::{HierarchyStore, NewLocation};

// ── Scan target ─────────────────────────────────────────────────────

/// What a scan covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanTarget {
    /// A subnet prefix of one to three octets, e.g. `192.168.1`.
    Range(String),
    /// One full address, probed directly.
    Single(Ipv4Addr),
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(prefix) => write!(f, "{prefix}"),
            Self::Single(ip) => write!(f, "{ip}"),
        }
    }
}

/// Validate user input as a scan target.
///
/// Accepts 7–15 characters forming 2–4 dot-separated decimal octets, each
/// 0–255. Four octets mean a single address; fewer mean a subnet prefix.
pub fn parse_scan_target(input: &str) -> Result<ScanTarget, CoreError> {
    let input = input.trim();
    let invalid = || {
        CoreError::validation(format!(
            "'{input}' is not an IP prefix like 192.168.1 or an address like 192.168.1.20"
        ))
    };

    if !(7..=15).contains(&input.len()) {
        return Err(invalid());
    }
    let octets = input
        .split('.')
        .map(|part| {
            if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u8>().ok()
        })
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(invalid)?;

    match octets.as_slice() {
        [a, b, c, d] => Ok(ScanTarget::Single(Ipv4Addr::new(*a, *b, *c, *d))),
        [_, _] | [_, _, _] => Ok(ScanTarget::Range(input.to_owned())),
        _ => Err(invalid()),
    }
}

// ── Candidates ──────────────────────────────────────────────────────

/// Progress of the metadata probe for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Enrichment {
    #[strum(serialize = "pending")]
    Pending,
    #[strum(serialize = "enriched")]
    Enriched,
    /// The probe failed; the candidate stays selectable with address only.
    #[strum(serialize = "unenriched")]
    Unenriched { reason: String },
}

/// A device found by a scan, not yet part of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub address: String,
    pub info: Option<ProbeInfo>,
    pub enrichment: Enrichment,
    pub selected: bool,
}

impl Candidate {
    fn new(address: String) -> Self {
        Self {
            address,
            info: None,
            enrichment: Enrichment::Pending,
            selected: false,
        }
    }

    /// Best available label: probed name, then hostname, then address.
    pub fn display_name(&self) -> String {
        self.info
            .as_ref()
            .and_then(|i| i.name.clone().or_else(|| i.hostname.clone()))
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.address.clone())
    }

    pub fn mac(&self) -> Option<MacAddress> {
        self.info
            .as_ref()
            .and_then(|i| i.mac.as_deref())
            .map(MacAddress::new)
    }
}

fn device_request(address: &str, info: Option<&ProbeInfo>) -> CreateDeviceRequest {
    let name = info
        .and_then(|i| i.name.clone().or_else(|| i.hostname.clone()))
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| address.to_owned());
    CreateDeviceRequest {
        name,
        hostname: info.and_then(|i| i.hostname.clone().or_else(|| i.name.clone())),
        ip_address: Some(address.to_owned()),
        mac_address: info
            .and_then(|i| i.mac.as_deref())
            .map(|m| MacAddress::new(m).to_string()),
        ..CreateDeviceRequest::default()
    }
}

// ── State machine ───────────────────────────────────────────────────

/// Observable discovery state.
///
/// `Idle → Scanning → Results → Committing → Idle`, with `Failed` reachable
/// from `Scanning`. A new scan or a reset may start from `Idle`, `Results`
/// or `Failed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Display)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiscoveryState {
    #[default]
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "scanning")]
    Scanning { target: ScanTarget },
    #[strum(serialize = "results")]
    Results { candidates: Vec<Candidate> },
    #[strum(serialize = "committing")]
    Committing { candidates: Vec<Candidate> },
    #[strum(serialize = "failed")]
    Failed { error: String },
}

impl DiscoveryState {
    fn candidates_mut(&mut self) -> Option<&mut Vec<Candidate>> {
        match self {
            Self::Results { candidates } | Self::Committing { candidates } => Some(candidates),
            _ => None,
        }
    }
}

// ── Commit report ───────────────────────────────────────────────────

/// How a Device reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommitRoute {
    Nested,
    Legacy,
}

#[derive(Debug, Clone, Serialize)]
pub struct Committed {
    pub address: String,
    pub name: String,
    pub route: CommitRoute,
    /// Target Location; `None` for legacy creation, which places the
    /// Device wherever the server decides.
    pub location: Option<LocationPath>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitFailure {
    pub address: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitReport {
    pub committed: Vec<Committed>,
    pub failed: Vec<CommitFailure>,
}

// ── Enrichment handle ───────────────────────────────────────────────

/// Background probes started by a scan.
///
/// Dropping the handle detaches the probes; they keep updating state.
#[derive(Debug)]
pub struct EnrichmentHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl EnrichmentHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every probe to settle.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "enrichment task aborted");
            }
        }
    }
}

// ── Coordinator ─────────────────────────────────────────────────────

/// Drives one discovery session at a time.
pub struct DiscoveryCoordinator {
    client: Arc<ResilientClient>,
    store: Arc<HierarchyStore>,
    state: Arc<watch::Sender<DiscoveryState>>,
    generation: Arc<AtomicU64>,
    scan_policy: RequestPolicy,
    probe_policy: RequestPolicy,
}

impl DiscoveryCoordinator {
    pub fn new(client: Arc<ResilientClient>, store: Arc<HierarchyStore>) -> Self {
        let (state, _) = watch::channel(DiscoveryState::Idle);
        let scan_policy = client.default_policy();
        Self {
            client,
            store,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            scan_policy,
            probe_policy: RequestPolicy::STATE_FETCH,
        }
    }

    /// Override the policy used for the scan call itself.
    pub fn with_scan_policy(mut self, policy: RequestPolicy) -> Self {
        self.scan_policy = policy;
        self
    }

    /// Override the policy used for per-candidate probes.
    pub fn with_probe_policy(mut self, policy: RequestPolicy) -> Self {
        self.probe_policy = policy;
        self
    }

    pub fn state(&self) -> DiscoveryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DiscoveryState> {
        self.state.subscribe()
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        match &*self.state.borrow() {
            DiscoveryState::Results { candidates } | DiscoveryState::Committing { candidates } => {
                candidates.clone()
            }
            _ => Vec::new(),
        }
    }

    // ── Scan ─────────────────────────────────────────────────────────

    /// Run a scan and publish its candidates.
    ///
    /// Returns once the address list is known; metadata probes continue in
    /// the background and can be awaited through the returned handle.
    pub async fn scan(&self, input: &str) -> Result<EnrichmentHandle, CoreError> {
        let target = parse_scan_target(input)?;

        let mut busy = None;
        self.state.send_if_modified(|state| match state {
            DiscoveryState::Scanning { .. } | DiscoveryState::Committing { .. } => {
                busy = Some(state.to_string());
                false
            }
            _ => {
                *state = DiscoveryState::Scanning {
                    target: target.clone(),
                };
                true
            }
        });
        if let Some(state) = busy {
            return Err(CoreError::InvalidState { state });
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let candidates = match self.gather(&target).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(target = %target, error = %e, "scan failed");
                self.state.send_replace(DiscoveryState::Failed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        info!(target = %target, found = candidates.len(), "scan complete");

        let pending: Vec<String> = candidates
            .iter()
            .filter(|c| c.enrichment == Enrichment::Pending)
            .map(|c| c.address.clone())
            .collect();
        self.state
            .send_replace(DiscoveryState::Results { candidates });

        let tasks = pending
            .into_iter()
            .map(|address| self.spawn_enrichment(generation, address))
            .collect();
        Ok(EnrichmentHandle { tasks })
    }

    async fn gather(&self, target: &ScanTarget) -> Result<Vec<Candidate>, CoreError> {
        match target {
            ScanTarget::Range(prefix) => {
                let addresses = self.client.discover(prefix, self.scan_policy).await?;
                let mut seen = HashSet::new();
                Ok(addresses
                    .into_iter()
                    .filter(|a| seen.insert(a.clone()))
                    .map(Candidate::new)
                    .collect())
            }
            ScanTarget::Single(ip) => {
                let address = ip.to_string();
                let mut candidate = Candidate::new(address.clone());
                match self.client.probe(&address, self.probe_policy).await {
                    Ok(info) => {
                        candidate.info = Some(info);
                        candidate.enrichment = Enrichment::Enriched;
                    }
                    Err(e @ lumen_api::Error::Timeout { .. }) => {
                        candidate.enrichment = Enrichment::Unenriched {
                            reason: e.to_string(),
                        };
                    }
                    Err(e) => return Err(e.into()),
                }
                Ok(vec![candidate])
            }
        }
    }

    fn spawn_enrichment(&self, generation: u64, address: String) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let policy = self.probe_policy;

        tokio::spawn(async move {
            let outcome = client.probe(&address, policy).await;
            if current.load(Ordering::SeqCst) != generation {
                debug!(address = %address, "dropping probe result from an earlier scan");
                return;
            }
            if let Err(e) = &outcome {
                warn!(address = %address, error = %e, "probe failed, keeping address-only candidate");
            }
            state.send_if_modified(|s| {
                let Some(candidate) = s
                    .candidates_mut()
                    .and_then(|list| list.iter_mut().find(|c| c.address == address))
                else {
                    return false;
                };
                match outcome {
                    Ok(info) => {
                        candidate.info = Some(info);
                        candidate.enrichment = Enrichment::Enriched;
                    }
                    Err(e) => {
                        candidate.enrichment = Enrichment::Unenriched {
                            reason: e.to_string(),
                        };
                    }
                }
                true
            });
        })
    }

    // ── Selection ────────────────────────────────────────────────────

    pub fn set_selected(&self, address: &str, selected: bool) -> Result<(), CoreError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| match state {
            DiscoveryState::Results { candidates } => {
                match candidates.iter_mut().find(|c| c.address == address) {
                    Some(candidate) if candidate.selected != selected => {
                        candidate.selected = selected;
                        true
                    }
                    Some(_) => false,
                    None => {
                        result = Err(CoreError::not_found("Candidate", address));
                        false
                    }
                }
            }
            other => {
                result = Err(CoreError::InvalidState {
                    state: other.to_string(),
                });
                false
            }
        });
        result
    }

    /// Select or clear every candidate.
    pub fn select_all(&self, selected: bool) -> Result<(), CoreError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| match state {
            DiscoveryState::Results { candidates } => {
                for candidate in candidates.iter_mut() {
                    candidate.selected = selected;
                }
                true
            }
            other => {
                result = Err(CoreError::InvalidState {
                    state: other.to_string(),
                });
                false
            }
        });
        result
    }

    /// Whether [`commit`](Self::commit) would proceed.
    pub fn can_commit(&self) -> bool {
        matches!(
            &*self.state.borrow(),
            DiscoveryState::Results { candidates } if candidates.iter().any(|c| c.selected)
        )
    }

    // ── Commit ───────────────────────────────────────────────────────

    /// Add every selected candidate to `group`.
    ///
    /// Candidates are processed sequentially so the first one can create
    /// the target Location and the rest reuse it. A failing candidate is
    /// logged and reported; it does not stop the others. The hierarchy is
    /// reloaded once at the end and the coordinator returns to `Idle`.
    pub async fn commit(&self, group: &GroupPath) -> Result<CommitReport, CoreError> {
        if self.store.snapshot().group(group).is_none() {
            return Err(CoreError::not_found("Group", group));
        }

        let mut selected = Vec::new();
        let mut refusal = None;
        self.state.send_if_modified(|state| match state {
            DiscoveryState::Results { candidates } => {
                selected = candidates.iter().filter(|c| c.selected).cloned().collect();
                if selected.is_empty() {
                    refusal = Some(CoreError::validation("select at least one device to add"));
                    return false;
                }
                let all = std::mem::take(candidates);
                *state = DiscoveryState::Committing { candidates: all };
                true
            }
            other => {
                refusal = Some(CoreError::InvalidState {
                    state: other.to_string(),
                });
                false
            }
        });
        if let Some(err) = refusal {
            return Err(err);
        }

        let mut report = CommitReport::default();
        let mut location: Option<LocationPath> = None;
        for candidate in &selected {
            match self.commit_one(group, candidate, &mut location).await {
                Ok(committed) => report.committed.push(committed),
                Err(e) => {
                    warn!(address = %candidate.address, error = %e, "device not added");
                    report.failed.push(CommitFailure {
                        address: candidate.address.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = self.store.reload().await {
            warn!(error = %e, "reload after discovery commit failed");
        }
        self.state.send_replace(DiscoveryState::Idle);
        info!(
            added = report.committed.len(),
            failed = report.failed.len(),
            "discovery commit finished"
        );
        Ok(report)
    }

    async fn commit_one(
        &self,
        group: &GroupPath,
        candidate: &Candidate,
        location: &mut Option<LocationPath>,
    ) -> Result<Committed, CoreError> {
        // Fresh metadata if the device answers; the scan-time probe otherwise.
        let info = match self.client.probe(&candidate.address, self.probe_policy).await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(address = %candidate.address, error = %e, "re-probe failed");
                candidate.info.clone()
            }
        };
        let request = device_request(&candidate.address, info.as_ref());

        let target = match location {
            Some(path) => path.clone(),
            None => {
                let path = self.resolve_location(group, &request.name).await?;
                *location = Some(path.clone());
                path
            }
        };

        match self
            .client
            .create_device(
                &target.zone_id.to_string(),
                &target.group_id.to_string(),
                &target.location_id.to_string(),
                &request,
            )
            .await
        {
            Ok(_) => Ok(Committed {
                address: candidate.address.clone(),
                name: request.name,
                route: CommitRoute::Nested,
                location: Some(target),
            }),
            Err(e) if needs_legacy_fallback(&e) => {
                warn!(
                    address = %candidate.address,
                    error = %e,
                    "nested device endpoint unusable, using legacy endpoint"
                );
                self.client
                    .add_device_legacy(&LegacyDeviceRequest::from(&request))
                    .await?;
                Ok(Committed {
                    address: candidate.address.clone(),
                    name: request.name,
                    route: CommitRoute::Legacy,
                    location: None,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First Location of the group, or a new one named after the Device.
    async fn resolve_location(
        &self,
        group: &GroupPath,
        device_name: &str,
    ) -> Result<LocationPath, CoreError> {
        if let Some(existing) = self
            .store
            .snapshot()
            .group(group)
            .and_then(|g| g.location.first())
        {
            return Ok(group.location(existing.location_id.clone()));
        }

        let created = self
            .store
            .create_location(
                group,
                NewLocation {
                    name: device_name.to_owned(),
                    ..NewLocation::default()
                },
            )
            .await?;
        Ok(group.location(created.location_id))
    }

    /// Return to `Idle`, discarding candidates. Refused while a scan or a
    /// commit is running; the running operation owns the state until it
    /// finishes.
    pub fn reset(&self) -> Result<(), CoreError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if matches!(
                state,
                DiscoveryState::Scanning { .. } | DiscoveryState::Committing { .. }
            ) {
                result = Err(CoreError::InvalidState {
                    state: state.to_string(),
                });
                return false;
            }
            *state = DiscoveryState::Idle;
            true
        });
        if result.is_ok() {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

/// The server was reached but the nested endpoint could not take the
/// request; the legacy endpoint may still work.
fn needs_legacy_fallback(err: &lumen_api::Error) -> bool {
    matches!(
        err,
        lumen_api::Error::Http { .. }
            | lumen_api::Error::Api { .. }
            | lumen_api::Error::Deserialization { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixes_and_addresses() {
        assert_eq!(
            parse_scan_target("192.168.1").ok(),
            Some(ScanTarget::Range("192.168.1".into()))
        );
        assert_eq!(
            parse_scan_target("10.0.0.1").ok(),
            Some(ScanTarget::Single(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(
            parse_scan_target(" 172.16 ").ok(),
            None,
            "too short once trimmed"
        );
        assert_eq!(
            parse_scan_target("192.168").ok(),
            Some(ScanTarget::Range("192.168".into()))
        );
    }

    #[test]
    fn rejects_malformed_targets() {
        for input in ["", "999.1.1", "1.2.3.4.5", "a.b.c.d", "192..168", "192.168.1.", "1234.1.1"] {
            assert!(
                matches!(parse_scan_target(input), Err(CoreError::Validation { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn candidate_display_name_falls_back_to_address() {
        let mut candidate = Candidate::new("10.0.0.5".into());
        assert_eq!(candidate.display_name(), "10.0.0.5");
        candidate.info = Some(ProbeInfo {
            hostname: Some("wled-porch".into()),
            ..ProbeInfo::default()
        });
        assert_eq!(candidate.display_name(), "wled-porch");
    }

    #[test]
    fn device_request_uses_probe_metadata() {
        let info = ProbeInfo {
            name: Some("Porch".into()),
            mac: Some("AABBCCDDEEFF".into()),
            ..ProbeInfo::default()
        };
        let req = device_request("10.0.0.5", Some(&info));
        assert_eq!(req.name, "Porch");
        assert_eq!(req.ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(req.mac_address.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(req.hostname.as_deref(), Some("Porch"));

        let bare = device_request("10.0.0.6", None);
        assert_eq!(bare.name, "10.0.0.6");
        assert!(bare.mac_address.is_none());
    }

    #[test]
    fn fallback_only_for_server_rejections() {
        assert!(needs_legacy_fallback(&lumen_api::Error::Http {
            status: 404,
            body: String::new()
        }));
        assert!(needs_legacy_fallback(&lumen_api::Error::Api {
            message: "Location not found".into()
        }));
        assert!(!needs_legacy_fallback(&lumen_api::Error::Timeout {
            timeout_ms: 100
        }));
        assert!(!needs_legacy_fallback(&lumen_api::Error::Cancelled));
    }

    #[test]
    fn state_names() {
        assert_eq!(DiscoveryState::Idle.to_string(), "idle");
        assert_eq!(
            DiscoveryState::Failed {
                error: "x".into()
            }
            .to_string(),
            "failed"
        );
        assert_eq!(CommitRoute::Legacy.to_string(), "legacy");
    }
}
