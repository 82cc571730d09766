/*! Integration tests for Rowfence.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - context: Tests for the SessionContext state machine
 * - scope: Tests for the scoped operations and their restoration guarantee
 * - role: Tests for the privileged/unprivileged role switching
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rowfence=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod role;
