use rand::Rng;
use thiserror::Error;

/// Length of a shareable invite code.
pub const CODE_LEN: usize = 8;

/// How many fresh codes the store may try before giving up on a
/// colliding insert.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Failures of the invite lifecycle. Storage-layer trouble (connectivity,
/// unrelated constraint violations) rides along in `Storage` and is the
/// caller's problem to report; the first three are domain outcomes.
#[derive(Debug, Error)]
pub enum InviteError {
    /// Redemption attempted with a code that was never issued.
    #[error("invite code not found")]
    InvalidCode,
    /// Redemption attempted with a code already bound to another user.
    #[error("invite code already redeemed")]
    AlreadyUsed,
    /// Every generated candidate collided with a stored code.
    #[error("could not generate a unique invite code after {} attempts", MAX_CODE_ATTEMPTS)]
    CodeCollision,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl InviteError {
    /// True for the outcomes a signup form should treat as user input
    /// errors rather than system failures.
    pub fn is_user_error(&self) -> bool {
        matches!(self, InviteError::InvalidCode | InviteError::AlreadyUsed)
    }
}

/// A fresh candidate invite code: short, alphanumeric, shareable over
/// email or SMS. Uniqueness is the store's job; on a collision it asks
/// for another one.
pub fn new_invite_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_short_and_alphanumeric() {
        for _ in 0..64 {
            let code = new_invite_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn user_errors_are_flagged() {
        assert!(InviteError::InvalidCode.is_user_error());
        assert!(InviteError::AlreadyUsed.is_user_error());
        assert!(!InviteError::CodeCollision.is_user_error());
        assert!(!InviteError::Storage(anyhow::anyhow!("disk gone")).is_user_error());
    }
}
