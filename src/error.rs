use thiserror::Error;

/// Rejected user input. The operation that raised it has not touched the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter a name and a 4-digit passcode")]
    EmptyName,

    #[error("Enter a name and a 4-digit passcode (got {0} characters)")]
    PasscodeLength(usize),

    #[error("Invalid Clock In format: {0:?}")]
    InvalidClockIn(String),

    #[error("Invalid Clock Out format: {0:?}")]
    InvalidClockOut(String),

    #[error("Clock Out must be after Clock In")]
    ClockOutNotAfterClockIn,

    #[error("Duration must be positive (got {0})")]
    NonPositiveDuration(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("User not found: {0}")]
    UnknownUser(String),

    #[error("Incorrect passcode")]
    IncorrectPasscode,
}
