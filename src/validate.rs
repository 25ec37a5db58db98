//! Argument validation.
//!
//! Runs before a command is queued, so a bad argument never costs a round
//! trip. Numeric ranges (priority, delay, TTR, timeouts) are enforced by
//! the `u32` parameter types.

use crate::error::ValidationError;

/// Maximum tube name length in bytes.
pub const TUBE_NAME_MAX_LEN: usize = 200;

/// Smallest valid job id.
pub const JOB_ID_MIN: u64 = 1;

#[inline]
fn is_tube_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"-+/;.$_()".contains(&c)
}

/// Check that `name` is 1-200 characters from `[A-Za-z0-9-+/;.$_()]`.
pub fn validate_tube_name(name: &str) -> Result<(), ValidationError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > TUBE_NAME_MAX_LEN || !bytes.iter().copied().all(is_tube_name_char) {
        return Err(ValidationError::TubeName(name.to_string()));
    }
    Ok(())
}

/// Check that `id` is a valid job id.
pub fn validate_job_id(id: u64) -> Result<(), ValidationError> {
    if id < JOB_ID_MIN {
        return Err(ValidationError::JobId(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tube_names() {
        for name in ["default", "a", "emails-2024", "x+y/z;w.v$u_t(s)", "ABC123"] {
            assert!(validate_tube_name(name).is_ok(), "{name} rejected");
        }
        assert!(validate_tube_name(&"t".repeat(200)).is_ok());
    }

    #[test]
    fn test_invalid_tube_names() {
        let long = "t".repeat(201);
        for name in ["", "with space", "tab\t", "ümlaut", "semi:colon", "star*", long.as_str()] {
            assert_eq!(
                validate_tube_name(name),
                Err(ValidationError::TubeName(name.to_string())),
                "{name} accepted"
            );
        }
    }

    #[test]
    fn test_job_id() {
        assert!(validate_job_id(1).is_ok());
        assert!(validate_job_id(u64::MAX).is_ok());
        assert_eq!(validate_job_id(0), Err(ValidationError::JobId(0)));
    }
}
