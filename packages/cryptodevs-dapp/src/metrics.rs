//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Reconciler ---
    pub refresh_total: AtomicU64,
    pub refresh_errors: AtomicU64,

    // --- Transactions ---
    pub tx_total: AtomicU64,
    pub tx_success: AtomicU64,
    pub tx_error: AtomicU64,
    pub tx_rejected: AtomicU64,

    // --- Latency (μs, updated via CAS) ---
    pub tx_duration_us_sum: AtomicU64,
    pub tx_duration_us_max: AtomicU64,

    // --- RPC ---
    pub rpc_failovers: AtomicU64,
    pub rpc_errors: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            refresh_total: AtomicU64::new(0),
            refresh_errors: AtomicU64::new(0),
            tx_total: AtomicU64::new(0),
            tx_success: AtomicU64::new(0),
            tx_error: AtomicU64::new(0),
            tx_rejected: AtomicU64::new(0),
            tx_duration_us_sum: AtomicU64::new(0),
            tx_duration_us_max: AtomicU64::new(0),
            rpc_failovers: AtomicU64::new(0),
            rpc_errors: AtomicU64::new(0),
        }
    }

    /// Time from submission request to confirmed receipt.
    pub fn record_tx_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.tx_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        // CAS loop for max tracking
        let mut cur = self.tx_duration_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.tx_duration_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, minted: u64, connected: bool) -> String {
        let refresh_total = self.refresh_total.load(Ordering::Relaxed);
        let refresh_errors = self.refresh_errors.load(Ordering::Relaxed);
        let tx_total = self.tx_total.load(Ordering::Relaxed);
        let tx_success = self.tx_success.load(Ordering::Relaxed);
        let tx_error = self.tx_error.load(Ordering::Relaxed);
        let tx_rejected = self.tx_rejected.load(Ordering::Relaxed);
        let tx_dur_sum = self.tx_duration_us_sum.load(Ordering::Relaxed);
        let tx_dur_max = self.tx_duration_us_max.swap(0, Ordering::Relaxed);
        let rpc_failovers = self.rpc_failovers.load(Ordering::Relaxed);
        let rpc_errors = self.rpc_errors.load(Ordering::Relaxed);
        let connected = u8::from(connected);

        // Convert μs to seconds for Prometheus conventions
        let tx_dur_sum_s = tx_dur_sum as f64 / 1_000_000.0;
        let tx_dur_max_s = tx_dur_max as f64 / 1_000_000.0;

        format!(
            "\
# HELP cryptodevs_refresh_total Reconciler passes started.\n\
# TYPE cryptodevs_refresh_total counter\n\
cryptodevs_refresh_total {refresh_total}\n\
# HELP cryptodevs_refresh_errors_total Reconciler passes with at least one failed read.\n\
# TYPE cryptodevs_refresh_errors_total counter\n\
cryptodevs_refresh_errors_total {refresh_errors}\n\
# HELP cryptodevs_tx_total Mint and start-presale transactions requested.\n\
# TYPE cryptodevs_tx_total counter\n\
cryptodevs_tx_total {tx_total}\n\
# HELP cryptodevs_tx_success_total Transactions confirmed successfully.\n\
# TYPE cryptodevs_tx_success_total counter\n\
cryptodevs_tx_success_total {tx_success}\n\
# HELP cryptodevs_tx_error_total Transactions that failed or reverted.\n\
# TYPE cryptodevs_tx_error_total counter\n\
cryptodevs_tx_error_total {tx_error}\n\
# HELP cryptodevs_tx_rejected_total Signature requests rejected in the wallet.\n\
# TYPE cryptodevs_tx_rejected_total counter\n\
cryptodevs_tx_rejected_total {tx_rejected}\n\
# HELP cryptodevs_tx_duration_seconds_sum Total submit-to-receipt time (seconds).\n\
# TYPE cryptodevs_tx_duration_seconds_sum counter\n\
cryptodevs_tx_duration_seconds_sum {tx_dur_sum_s:.6}\n\
# HELP cryptodevs_tx_duration_seconds_max Max submit-to-receipt time since last scrape (seconds).\n\
# TYPE cryptodevs_tx_duration_seconds_max gauge\n\
cryptodevs_tx_duration_seconds_max {tx_dur_max_s:.6}\n\
# HELP cryptodevs_rpc_failovers_total RPC primary-to-fallback failovers.\n\
# TYPE cryptodevs_rpc_failovers_total counter\n\
cryptodevs_rpc_failovers_total {rpc_failovers}\n\
# HELP cryptodevs_rpc_errors_total RPC errors.\n\
# TYPE cryptodevs_rpc_errors_total counter\n\
cryptodevs_rpc_errors_total {rpc_errors}\n\
# HELP cryptodevs_tokens_minted Tokens minted as last observed on-chain.\n\
# TYPE cryptodevs_tokens_minted gauge\n\
cryptodevs_tokens_minted {minted}\n\
# HELP cryptodevs_wallet_connected Whether a wallet session is connected.\n\
# TYPE cryptodevs_wallet_connected gauge\n\
cryptodevs_wallet_connected {connected}\n"
        )
    }
}
