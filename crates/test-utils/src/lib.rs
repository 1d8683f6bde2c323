//! Shared helpers for pipedag's integration tests.

pub mod builders;
pub mod fake_task;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use pipedag::logging::LOG_ENV;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for a single engine run in tests. Fake tasks sleep for tens
/// of milliseconds at most; shell pipelines spawn a handful of processes.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// Used when neither `PIPEDAG_LOG` nor `RUST_LOG` is set.
const DEFAULT_TEST_FILTER: &str = "pipedag=debug,warn";

static INIT: Once = Once::new();

/// Capture tracing output per test.
///
/// The filter comes from `PIPEDAG_LOG`, then `RUST_LOG`, then
/// `pipedag=debug,warn`. Output only shows for failing tests unless run
/// with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

        // Another harness may have installed a subscriber already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`RUN_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(RUN_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("pipeline run did not finish within {RUN_TIMEOUT:?}"),
    }
}
