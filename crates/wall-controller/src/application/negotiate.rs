//! Device resolution negotiation.
//!
//! For a set of devices and a desired per-tile resolution, push the desired
//! resolution to every device concurrently and collect what each device
//! actually applied. Each device call is an isolated task with its own
//! timeout: one unreachable encoder must never stall or fail the rest of the
//! wall.
//!
//! After the fan-in, [`select_authoritative`] decides which reported
//! resolution the final plan is computed from. Devices are untrusted about
//! honoring requests but trusted about reporting: the value a device reports
//! back always wins over the value that was asked for.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use wall_core::{DeviceEndpoint, DeviceFailure, DeviceId, NegotiationResult, Resolution};

use crate::infrastructure::device::DeviceClient;

/// One device paired with its control client.
#[derive(Clone)]
pub struct DeviceHandle {
    pub endpoint: DeviceEndpoint,
    pub client: Arc<dyn DeviceClient>,
}

/// Outcome of one negotiation round across all devices.
#[derive(Debug)]
pub struct NegotiationReport {
    /// Successful results, in configured device order.
    pub results: Vec<NegotiationResult>,
    /// Devices that produced no usable result this round.
    pub failures: Vec<DeviceFailure>,
}

impl NegotiationReport {
    pub fn result_for(&self, id: DeviceId) -> Option<&NegotiationResult> {
        self.results.iter().find(|r| r.device_id == id)
    }
}

/// Requests `desired` on every device concurrently and collects the
/// per-device outcomes.
///
/// Waits until every device has answered or hit `per_device_timeout`; there
/// is no whole-round timeout, so the round takes at most one device timeout
/// regardless of wall size.
pub async fn negotiate(
    devices: &[DeviceHandle],
    desired: Resolution,
    per_device_timeout: Duration,
) -> NegotiationReport {
    let mut tasks: JoinSet<Result<NegotiationResult, DeviceFailure>> = JoinSet::new();

    for handle in devices {
        let client = Arc::clone(&handle.client);
        let endpoint = handle.endpoint.clone();
        tasks.spawn(async move {
            negotiate_one(&endpoint, client.as_ref(), desired, per_device_timeout).await
        });
    }

    let mut results = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(failure)) => {
                warn!(
                    device = %failure.device_name,
                    error = %failure.error,
                    "device negotiation failed; excluding from this run"
                );
                failures.push(failure);
            }
            Err(e) => warn!("negotiation task aborted: {e}"),
        }
    }

    // JoinSet yields in completion order; restore configured device order so
    // the "first successful device" fallback is deterministic.
    let order: Vec<DeviceId> = devices.iter().map(|d| d.endpoint.id).collect();
    results.sort_by_key(|r| order.iter().position(|id| *id == r.device_id));
    failures.sort_by_key(|f| order.iter().position(|id| *id == f.device_id));

    NegotiationReport { results, failures }
}

async fn negotiate_one(
    endpoint: &DeviceEndpoint,
    client: &dyn DeviceClient,
    desired: Resolution,
    timeout: Duration,
) -> Result<NegotiationResult, DeviceFailure> {
    let failure = |error: String| DeviceFailure {
        device_id: endpoint.id,
        device_name: endpoint.name.clone(),
        error,
    };

    let actual = match tokio::time::timeout(timeout, client.apply_resolution(desired)).await {
        Ok(Ok(actual)) => actual,
        Ok(Err(e)) => return Err(failure(e.to_string())),
        Err(_) => return Err(failure(format!("no response within {}ms", timeout.as_millis()))),
    };

    if actual != desired {
        debug!(
            device = %endpoint.name,
            requested = %desired,
            actual = %actual,
            "device clamped the requested resolution"
        );
    }

    // Best-effort signal probe for diagnostics; a failure here does not
    // disqualify the device.
    if let Ok(Ok(signal)) = tokio::time::timeout(timeout, client.signal_info()).await {
        debug!(
            device = %endpoint.name,
            width = signal.width,
            height = signal.height,
            "input signal"
        );
    }

    Ok(NegotiationResult {
        device_id: endpoint.id,
        device_name: endpoint.name.clone(),
        requested: desired,
        actual,
    })
}

/// Picks the authoritative resolution from a negotiation round.
///
/// Unanimous agreement wins as-is. On disagreement the designated reference
/// device's value is chosen and a warning is produced; if the reference
/// device has no result this round, the first successful device stands in
/// (still warned). Returns `None` when no device succeeded.
pub fn select_authoritative(
    report: &NegotiationReport,
    reference: Option<DeviceId>,
) -> Option<(Resolution, Option<String>)> {
    let first = report.results.first()?;

    if report.results.iter().all(|r| r.actual == first.actual) {
        return Some((first.actual, None));
    }

    let chosen = reference
        .and_then(|id| report.result_for(id))
        .unwrap_or(first);
    let warning = format!(
        "devices disagree on applied resolution; using {} reported by '{}'",
        chosen.actual, chosen.device_name
    );
    Some((chosen.actual, Some(warning)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
