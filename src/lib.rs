pub mod alerts; // Alert generation, feed queries, letter requests
pub mod clinical; // eGFR/uACR, KDIGO matrix, referral + follow-up rules
pub mod config;
pub mod history; // Visit timeline + rapid decline
pub mod models;
pub mod patient_cache;
pub mod prediction;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
