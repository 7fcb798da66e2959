use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::{Mutex, OnceLock},
};

static METRICS_STATE: OnceLock<MetricsState> = OnceLock::new();

#[derive(Default)]
pub(crate) struct MetricsState {
    pub(crate) auth_failures: Mutex<HashMap<&'static str, u64>>,
    pub(crate) ws_disconnects: Mutex<HashMap<&'static str, u64>>,
    pub(crate) frames_dropped: Mutex<HashMap<(&'static str, &'static str), u64>>,
}

pub(crate) fn metrics_state() -> &'static MetricsState {
    METRICS_STATE.get_or_init(MetricsState::default)
}

pub(crate) fn record_auth_failure(reason: &'static str) {
    if let Ok(mut counters) = metrics_state().auth_failures.lock() {
        *counters.entry(reason).or_insert(0) += 1;
    }
}

pub(crate) fn record_ws_disconnect(reason: &'static str) {
    if let Ok(mut counters) = metrics_state().ws_disconnects.lock() {
        *counters.entry(reason).or_insert(0) += 1;
    }
}

pub(crate) fn record_frame_dropped(target: &'static str, reason: &'static str) {
    if let Ok(mut counters) = metrics_state().frames_dropped.lock() {
        *counters.entry((target, reason)).or_insert(0) += 1;
    }
}

pub(crate) fn render_metrics() -> String {
    let auth_failures = metrics_state()
        .auth_failures
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());
    let ws_disconnects = metrics_state()
        .ws_disconnects
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());
    let frames_dropped = metrics_state()
        .frames_dropped
        .lock()
        .map_or_else(|_| HashMap::new(), |guard| guard.clone());

    let mut output = String::new();
    output.push_str("# HELP parlor_auth_failures_total Count of auth-related failures by reason\n");
    output.push_str("# TYPE parlor_auth_failures_total counter\n");
    let mut auth_entries: Vec<_> = auth_failures.into_iter().collect();
    auth_entries.sort_by_key(|(reason, _)| *reason);
    for (reason, value) in auth_entries {
        let _ = writeln!(
            output,
            "parlor_auth_failures_total{{reason=\"{reason}\"}} {value}"
        );
    }

    output.push_str(
        "# HELP parlor_ws_disconnects_total Count of websocket disconnect events by reason\n",
    );
    output.push_str("# TYPE parlor_ws_disconnects_total counter\n");
    let mut ws_entries: Vec<_> = ws_disconnects.into_iter().collect();
    ws_entries.sort_by_key(|(reason, _)| *reason);
    for (reason, value) in ws_entries {
        let _ = writeln!(
            output,
            "parlor_ws_disconnects_total{{reason=\"{reason}\"}} {value}"
        );
    }

    output.push_str(
        "# HELP parlor_frames_dropped_total Count of fan-out frames dropped by target and reason\n",
    );
    output.push_str("# TYPE parlor_frames_dropped_total counter\n");
    let mut drop_entries: Vec<_> = frames_dropped.into_iter().collect();
    drop_entries.sort_by_key(|((target, reason), _)| (*target, *reason));
    for ((target, reason), value) in drop_entries {
        let _ = writeln!(
            output,
            "parlor_frames_dropped_total{{target=\"{target}\",reason=\"{reason}\"}} {value}"
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{record_frame_dropped, record_ws_disconnect, render_metrics};

    #[test]
    fn render_includes_recorded_counters() {
        record_ws_disconnect("test_reason");
        record_frame_dropped("room", "full_queue");

        let output = render_metrics();
        assert!(output.contains("parlor_ws_disconnects_total{reason=\"test_reason\"}"));
        assert!(
            output.contains("parlor_frames_dropped_total{target=\"room\",reason=\"full_queue\"}")
        );
        assert!(output.contains("# TYPE parlor_auth_failures_total counter"));
    }
}
