//! Fixed-budget retry for transient transport failures.

use log::{debug, warn};
use std::fmt::Display;

/// Retries granted after the first attempt, so four attempts in total.
pub const DEFAULT_RETRIES: u32 = 3;

/// Runs `operation` until it succeeds, fails with an error `is_transient`
/// rejects, or the retry budget runs out.
///
/// Attempts are sequential with no delay between them. The last error is
/// returned unchanged.
pub fn with_retry<T, E, F, P>(
    operation_name: &str,
    retries: u32,
    mut operation: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut remaining = retries;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if is_transient(&e) && remaining > 0 => {
                remaining -= 1;
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying...",
                    operation_name,
                    retries - remaining,
                    retries + 1,
                    e
                );
            }
            Err(e) => {
                if is_transient(&e) {
                    debug!(
                        "{}: giving up after {} attempts: {}",
                        operation_name,
                        retries + 1,
                        e
                    );
                } else {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                }
                return Err(e);
            }
        }
    }
}
