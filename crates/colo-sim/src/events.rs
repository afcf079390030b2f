use colo_routing::{Addr, AddressSet, MatchPolicy};
use serde::Serialize;
use std::io::Write;

use crate::sim::{Change, Snapshot};

/// Emit a JSONL event to stdout (flushed immediately for piped output).
pub fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{json}");
        let _ = lock.flush();
    }
}

// ── Session events ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventStarted {
    pub event: &'static str,
    pub scenario: String,
    pub policy: String,
    pub leaves: usize,
    pub steps: usize,
}

impl EventStarted {
    pub fn new(scenario: &str, policy: MatchPolicy, leaves: usize, steps: usize) -> Self {
        Self {
            event: "started",
            scenario: scenario.to_string(),
            policy: format!("{policy:?}"),
            leaves,
            steps,
        }
    }
}

#[derive(Serialize)]
pub struct EventStep {
    pub event: &'static str,
    pub step: usize,
    pub action: String,
    /// False when the step re-delivered an equal value.
    pub applied: bool,
}

#[derive(Serialize)]
pub struct EventSummary {
    pub event: &'static str,
    pub steps: usize,
    pub relay_changes: usize,
    pub output_changes: usize,
}

// ── Dataflow events ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventRelays {
    pub event: &'static str,
    pub step: usize,
    pub count: usize,
    pub addrs: Vec<String>,
}

#[derive(Serialize)]
pub struct EventOutput {
    pub event: &'static str,
    pub step: usize,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub leaves: Vec<LeafView>,
}

#[derive(Serialize)]
pub struct LeafView {
    pub id: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn addr_strings(addrs: &AddressSet) -> Vec<String> {
    addrs.iter().map(ToString::to_string).collect()
}

impl LeafView {
    fn new(id: String, addr: &Addr) -> Self {
        let (state, addrs, message) = match addr {
            Addr::Bound { addrs, .. } => ("bound", addr_strings(addrs), None),
            Addr::Neg => ("neg", Vec::new(), None),
            Addr::Pending => ("pending", Vec::new(), None),
            Addr::Failed(failure) => ("failed", Vec::new(), Some(failure.message().to_string())),
        };
        Self {
            id,
            state,
            addrs,
            message,
        }
    }
}

impl EventOutput {
    pub fn new(step: usize, snapshot: &Snapshot) -> Self {
        let (state, message, leaves) = match snapshot {
            Snapshot::Pending => ("pending", None, Vec::new()),
            Snapshot::Failed(message) => ("failed", Some(message.clone()), Vec::new()),
            Snapshot::Ready(leaves) => (
                "ready",
                None,
                leaves
                    .iter()
                    .map(|(id, addr)| LeafView::new(id.to_string(), addr))
                    .collect(),
            ),
        };
        Self {
            event: "output",
            step,
            state,
            message,
            leaves,
        }
    }
}

/// Emit one event per observed change. Returns `(relay, output)` counts.
pub fn emit_changes(step: usize, changes: &[Change]) -> (usize, usize) {
    let mut counts = (0, 0);
    for change in changes {
        match change {
            Change::Relays(relays) => {
                counts.0 += 1;
                emit(&EventRelays {
                    event: "relays",
                    step,
                    count: relays.len(),
                    addrs: addr_strings(relays),
                });
            }
            Change::Output(snapshot) => {
                counts.1 += 1;
                emit(&EventOutput::new(step, snapshot));
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use colo_routing::Path;

    #[test]
    fn output_event_shape() {
        let snapshot = Snapshot::Ready(vec![
            (
                "/svc/users".parse::<Path>().unwrap(),
                Addr::bound(["10.1.2.9:4141".parse().unwrap()]),
            ),
            ("/svc/legacy".parse().unwrap(), Addr::failed("no endpoints")),
        ]);
        let json = serde_json::to_value(EventOutput::new(3, &snapshot)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "output",
                "step": 3,
                "state": "ready",
                "leaves": [
                    { "id": "/svc/users", "state": "bound", "addrs": ["10.1.2.9:4141"] },
                    { "id": "/svc/legacy", "state": "failed", "message": "no endpoints" }
                ]
            })
        );
    }

    #[test]
    fn failed_output_carries_message() {
        let json =
            serde_json::to_value(EventOutput::new(0, &Snapshot::Failed("pool gone".into())))
                .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["message"], "pool gone");
        assert_eq!(json["leaves"], serde_json::json!([]));
    }
}
