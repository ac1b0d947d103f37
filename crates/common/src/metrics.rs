//! Prometheus metrics (default registry)
//!
//! Counters are registered lazily on first use; `render` produces the text
//! exposition served on `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};

static REQUEST_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hive_request_transitions_total",
        "Service request status transitions, by target status",
        &["status"]
    )
    .expect("register request_transitions_total")
});

static SETTLEMENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "hive_settlements_total",
        "Completed service requests settled on the time ledger"
    )
    .expect("register settlements_total")
});

static SETTLED_MINUTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "hive_settled_minutes_total",
        "Minutes of time credit moved by settlements"
    )
    .expect("register settled_minutes_total")
});

static MODERATION_ACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hive_moderation_actions_total",
        "Staff moderation actions, by action",
        &["action"]
    )
    .expect("register moderation_actions_total")
});

pub fn record_transition(status: &str) {
    REQUEST_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_settlement(minutes: i64) {
    SETTLEMENTS_TOTAL.inc();
    SETTLED_MINUTES_TOTAL.inc_by(minutes.max(0) as u64);
}

pub fn record_moderation(action: &str) {
    MODERATION_ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Encode every metric family of the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    // Touch the statics so the families show up before their first event.
    Lazy::force(&REQUEST_TRANSITIONS_TOTAL);
    Lazy::force(&SETTLEMENTS_TOTAL);
    Lazy::force(&SETTLED_MINUTES_TOTAL);
    Lazy::force(&MODERATION_ACTIONS_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_contains_recorded_series() {
        record_transition("accepted");
        record_settlement(180);
        record_moderation("user_banned");
        let text = render().unwrap();
        assert!(text.contains("hive_request_transitions_total"));
        assert!(text.contains("status=\"accepted\""));
        assert!(text.contains("hive_settlements_total"));
        assert!(text.contains("action=\"user_banned\""));
    }
}
