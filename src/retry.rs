//! Bounded retry for transport operations.

/// Run `op` up to `attempts` times, returning the first success or the last
/// error. `op` receives the 1-based attempt number.
///
/// `attempts == 0` is treated as a single attempt.
pub fn with_retries<T, E>(
    attempts: u8,
    mut op: impl FnMut(u8) -> Result<T, E>,
) -> Result<T, E> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                error!("transfer failed, attempt {} of {}", attempt, attempts);
                attempt += 1;
            }
        }
    }
}
