//! Custom `garde` rules shared by the request payloads.

/// Password policy applied at registration, admin creation and change.
///
/// # Arguments
///
/// * `password` - The candidate password.
///
/// # Returns
///
/// A `garde::Result` indicating whether the password is acceptable.
pub fn password_strength(password: &str, _context: &()) -> garde::Result {
    if password.len() < 8 {
        return Err(garde::Error::new(
            "password must be at least 8 characters long",
        ));
    }

    if password.len() > 128 {
        return Err(garde::Error::new("password must be at most 128 characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_passwords() {
        assert!(password_strength("seven77", &()).is_err());
        assert!(password_strength("eight888", &()).is_ok());
    }

    #[test]
    fn rejects_overlong_passwords() {
        let too_long = "x".repeat(129);
        assert!(password_strength(&too_long, &()).is_err());
        assert!(password_strength(&"x".repeat(128), &()).is_ok());
    }
}
