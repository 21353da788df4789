//! Prometheus counters for store activity (default registry).

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

pub static USERS_REGISTERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("task_api_users_registered_total", "Total successful registrations")
        .expect("register users_registered_total")
});

pub static LOGINS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("task_api_logins_total", "Login attempts by outcome", &["outcome"])
        .expect("register logins_total")
});

pub static SESSIONS_SWEPT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("task_api_sessions_swept_total", "Sessions removed by the GC sweep")
        .expect("register sessions_swept_total")
});

pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("task_api_sessions_active", "Live sessions after the last GC sweep")
        .expect("register sessions_active")
});

pub static TASKS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("task_api_tasks_created_total", "Total tasks created")
        .expect("register tasks_created_total")
});

pub static TASKS_COMPLETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("task_api_tasks_completed_total", "Tasks moved to ready by workers")
        .expect("register tasks_completed_total")
});

pub fn record_registration() {
    USERS_REGISTERED_TOTAL.inc();
}

pub fn record_login(ok: bool) {
    LOGINS_TOTAL.with_label_values(&[if ok { "ok" } else { "failed" }]).inc();
}

pub fn record_sessions_swept(n: usize) {
    SESSIONS_SWEPT_TOTAL.inc_by(n as u64);
}

pub fn record_sessions_active(n: usize) {
    SESSIONS_ACTIVE.set(i64::try_from(n).unwrap_or(i64::MAX));
}

pub fn record_task_created() {
    TASKS_CREATED_TOTAL.inc();
}

pub fn record_task_completed() {
    TASKS_COMPLETED_TOTAL.inc();
}

/// Render the default registry in the text exposition format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        record_task_created();
        record_login(true);
        let text = encode_metrics().unwrap();
        assert!(text.contains("task_api_tasks_created_total"));
        assert!(text.contains(r#"task_api_logins_total{outcome="ok"}"#));
    }
}
