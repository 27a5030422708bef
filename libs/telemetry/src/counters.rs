pub const WEBHOOK_EVENTS: &str = "waflow_webhook_events_total";
pub const SENDS: &str = "waflow_sends_total";
pub const FLOW_OPS: &str = "waflow_flow_ops_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Error => "error",
        }
    }

    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() { Outcome::Ok } else { Outcome::Error }
    }
}

/// `kind` is `message` or `status`.
pub fn record_webhook_event(kind: &'static str) {
    metrics::counter!(WEBHOOK_EVENTS, "kind" => kind).increment(1);
}

pub fn record_send(kind: &'static str, outcome: Outcome) {
    metrics::counter!(SENDS, "kind" => kind, "outcome" => outcome.as_str()).increment(1);
}

pub fn record_flow_op(op: &'static str, outcome: Outcome) {
    metrics::counter!(FLOW_OPS, "op" => op, "outcome" => outcome.as_str()).increment(1);
}
