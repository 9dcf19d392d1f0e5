// Domain error types - one enum per trust boundary, with explicit mapping between them

use thiserror::Error;

/// Process-level error for configuration, clients and startup
#[derive(Error, Debug)]
pub enum FinplanError {
    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Cryptographic error (HTTP 500)
    #[error("Cryptographic error: {0}")]
    CryptoError(#[from] CryptoError),

    /// Storage error (HTTP 500)
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    /// Dependency failure (HTTP 502)
    /// Used when a remote service is unreachable or answers with garbage
    #[error("Dependency failure ({service}): {error}")]
    DependencyFailure { service: String, error: String },

    /// Remote call exceeded its deadline (HTTP 504)
    #[error("Timeout calling {service} after {secs}s")]
    Timeout { service: String, secs: u64 },

    /// I/O Error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FinplanError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            FinplanError::DependencyFailure { .. } => 502,
            FinplanError::Timeout { .. } => 504,
            _ => 500,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            FinplanError::DependencyFailure { .. } => "service unavailable".to_string(),
            FinplanError::Timeout { .. } => "upstream timeout".to_string(),
            _ => "internal error".to_string(),
        }
    }
}

/// Credential store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness constraint on email rejected the insert
    #[error("record already exists")]
    AlreadyExists,

    #[error("record not found")]
    NotFound,

    /// Anything else the backend reported
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage operation timed out after {0}s")]
    Timeout(u64),
}

/// Cryptographic operation errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Shared secret missing or unusable
    #[error("Invalid shared secret: {0}")]
    SecretError(String),

    /// Failed to sign token
    #[error("Failed to sign token: {0}")]
    SigningError(String),

    /// Failed to hash or compare a password
    #[error("Failed to hash password: {0}")]
    HashingError(String),
}

/// Why a token was refused
///
/// Kept internal: every variant collapses to the same public outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,

    #[error("signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("subject claim missing or malformed")]
    MissingSubject,

    /// Refused by a remote identity service, which does not say why
    #[error("rejected by identity service")]
    Rejected,
}

/// Identity service error taxonomy
///
/// These never leave the service as-is; see [`AuthError::publicize`].
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid email format")]
    InvalidEmail,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user already exists")]
    UserExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(TokenError),

    /// Storage, hashing or signing failure
    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => AuthError::UserExists,
            StoreError::NotFound => AuthError::UserNotFound,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSubject => AuthError::UserNotFound,
            other => AuthError::InvalidToken(other),
        }
    }
}

impl From<CryptoError> for AuthError {
    fn from(err: CryptoError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl AuthError {
    /// Collapse into the externally visible category.
    ///
    /// Unknown email, wrong password and every token failure become the same
    /// `Unauthenticated` value.
    pub fn publicize(&self) -> PublicError {
        match self {
            AuthError::InvalidEmail => PublicError::InvalidInput("invalid email format".to_string()),
            AuthError::InvalidInput(msg) => PublicError::InvalidInput(msg.clone()),
            AuthError::UserExists => PublicError::AlreadyExists,
            AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken(_) => PublicError::Unauthenticated,
            AuthError::Internal(_) => PublicError::Internal,
        }
    }
}

/// Externally visible error category
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublicError {
    /// Malformed request body or fields (HTTP 400)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Registration conflict (HTTP 409)
    #[error("already exists")]
    AlreadyExists,

    /// Bad credentials or bad/expired token (HTTP 401)
    #[error("unauthenticated")]
    Unauthenticated,

    /// Anything not attributable to the caller (HTTP 500)
    #[error("internal failure")]
    Internal,
}

impl PublicError {
    pub fn status_code(&self) -> u16 {
        match self {
            PublicError::InvalidInput(_) => 400,
            PublicError::AlreadyExists => 409,
            PublicError::Unauthenticated => 401,
            PublicError::Internal => 500,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PublicError::InvalidInput(msg) => msg.clone(),
            PublicError::AlreadyExists => "user already exists".to_string(),
            PublicError::Unauthenticated => "invalid credentials".to_string(),
            PublicError::Internal => "internal error".to_string(),
        }
    }

    /// Stable machine-readable category used on the RPC wire
    pub fn code(&self) -> &'static str {
        match self {
            PublicError::InvalidInput(_) => "invalid_input",
            PublicError::AlreadyExists => "already_exists",
            PublicError::Unauthenticated => "unauthenticated",
            PublicError::Internal => "internal",
        }
    }

    /// Rebuild a category from the wire, falling back to the HTTP status
    pub fn from_wire(code: Option<&str>, status: u16, message: &str) -> Self {
        match code {
            Some("invalid_input") => PublicError::InvalidInput(message.to_string()),
            Some("already_exists") => PublicError::AlreadyExists,
            Some("unauthenticated") => PublicError::Unauthenticated,
            Some("internal") => PublicError::Internal,
            _ => match status {
                400 => PublicError::InvalidInput(message.to_string()),
                409 => PublicError::AlreadyExists,
                401 | 403 => PublicError::Unauthenticated,
                _ => PublicError::Internal,
            },
        }
    }
}

/// The only two failures a protected route can produce
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRejection {
    #[error("missing auth header")]
    MissingAuthHeader,

    #[error("invalid or expired token")]
    InvalidToken,
}

impl EdgeRejection {
    pub fn status_code(&self) -> u16 {
        401
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
