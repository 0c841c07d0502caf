//! Shared setup for the Pact contract tests

use std::sync::Once;

static RUSTLS_INIT: Once = Once::new();

/// Install the ring crypto provider once per test binary, as `main` does
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}
