use garde::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;

/// Login form input. The password is wiped from memory on drop.
#[derive(Validate, Zeroize, ZeroizeOnDrop)]
pub struct LoginCredentials {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    /// Checks the email format and that a password was given.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }
}
