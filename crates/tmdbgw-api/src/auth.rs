//! Bearer token gate for the inbound endpoint.

use anyhow::{Context, Result, bail};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

/// Scheme prefix of the `Authorization` header. Case-sensitive.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Token size in bytes before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// Length of a hex-encoded token.
pub const TOKEN_HEX_LEN: usize = 64;

/// Message returned to unauthenticated callers, whatever the reason.
pub const UNAUTHORIZED_MESSAGE: &str = "missing or invalid bearer token";

/// Why a request was denied. Logged only, never sent to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No `Authorization` header.
    MissingHeader,
    /// Header present without the `Bearer ` prefix.
    MalformedHeader,
    /// Token does not match.
    InvalidToken,
}

impl DenyReason {
    /// Stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader => "malformed_header",
            Self::InvalidToken => "invalid_token",
        }
    }
}

/// Result of [`BearerAuth::authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// The token matched.
    Allowed,
    /// The request must be rejected with 401.
    Denied(DenyReason),
}

/// Validates `Authorization: Bearer <token>` against a fixed secret.
#[derive(Clone)]
pub struct BearerAuth {
    expected: Vec<u8>,
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("expected", &"<redacted>")
            .finish()
    }
}

impl BearerAuth {
    /// Creates a gate accepting `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            expected: token.into().into_bytes(),
        }
    }

    /// Checks the raw `Authorization` header value.
    ///
    /// Emits one warn event per denial.
    #[must_use]
    pub fn authorize(&self, header: Option<&str>) -> AuthDecision {
        let decision = match header {
            None => AuthDecision::Denied(DenyReason::MissingHeader),
            Some(value) => match value.strip_prefix(BEARER_PREFIX) {
                None => AuthDecision::Denied(DenyReason::MalformedHeader),
                Some(token) if self.verify(token) => AuthDecision::Allowed,
                Some(_) => AuthDecision::Denied(DenyReason::InvalidToken),
            },
        };
        if let AuthDecision::Denied(reason) = decision {
            tracing::warn!(reason = reason.as_str(), "Authentication failed");
        }
        decision
    }

    /// Compares `presented` with the expected token in constant time.
    ///
    /// The presented bytes are copied into a buffer of the expected length so
    /// the work done depends only on the expected length.
    #[must_use]
    pub fn verify(&self, presented: &str) -> bool {
        let presented = presented.as_bytes();
        let mut padded = vec![0_u8; self.expected.len()];
        for (index, slot) in padded.iter_mut().enumerate() {
            *slot = presented.get(index).copied().unwrap_or(0);
        }
        let same_bytes = padded.as_slice().ct_eq(self.expected.as_slice());
        let same_len = presented.len().ct_eq(&self.expected.len());
        (same_bytes & same_len).into()
    }
}

/// Generates a 256-bit token from the OS random source, hex encoded.
///
/// # Errors
///
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0_u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to read from the OS random source")?;
    Ok(hex::encode(bytes))
}

/// Checks that `token` is exactly [`TOKEN_HEX_LEN`] hex characters.
///
/// # Errors
///
/// Returns an error describing the first violated rule.
pub fn validate_token(token: &str) -> Result<()> {
    if token.len() != TOKEN_HEX_LEN {
        bail!(
            "token must be {TOKEN_HEX_LEN} hex characters, got {} characters",
            token.len()
        );
    }
    if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("token must contain only hex characters");
    }
    Ok(())
}
