//! Credential comparison.

/// Compare a supplied password with the stored credential.
///
/// Runs in time independent of where the inputs first differ.
pub fn verify_password(stored: &str, supplied: &str) -> bool {
    constant_time_eq(stored.as_bytes(), supplied.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
