use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

pub static DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "blockvote_guard_decisions_total",
        "Gate outcomes per action",
        &["action", "kind"]
    )
        .expect("register blockvote_guard_decisions_total")
});

pub static LIMITER_BLOCKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "blockvote_guard_limiter_blocks_total",
        "Hard blocks started by a rate limiter",
        &["limiter"]
    )
        .expect("register blockvote_guard_limiter_blocks_total")
});

pub static LIMITER_ENTRIES: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "blockvote_guard_limiter_entries",
        "Tracked (identifier, action) pairs after the last sweep",
        &["limiter"]
    )
        .expect("register blockvote_guard_limiter_entries")
});

#[inline]
pub fn inc_decision(action: &str, kind: &str) {
    DECISIONS_TOTAL.with_label_values(&[action, kind]).inc();
}

#[inline]
pub fn inc_limiter_block(limiter: &str) {
    LIMITER_BLOCKS_TOTAL.with_label_values(&[limiter]).inc();
}

#[inline]
pub fn set_limiter_entries(limiter: &str, n: usize) {
    LIMITER_ENTRIES.with_label_values(&[limiter]).set(n as i64);
}
