//! Password resolution for `set-user`.
//!
//! Config carries only the env var NAME (`credentials.password_env`). The value
//! is read once, handed to the credential store and never logged. Errors and
//! `Debug` output mention the NAME only.

/// Manager password read from the environment or an operator prompt.
#[derive(Clone)]
pub struct ResolvedPassword {
    value: String,
    source: String,
}

impl ResolvedPassword {
    pub fn new(value: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: source.into(),
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Where the value came from: an env var name or `stdin`.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for ResolvedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedPassword")
            .field("value", &"<REDACTED>")
            .field("source", &self.source)
            .finish()
    }
}

/// Read the password from the env var named `var_name`.
/// `None` when unset or blank; callers then fall back to stdin.
pub fn password_from_env(var_name: &str) -> Option<ResolvedPassword> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(ResolvedPassword::new(v, var_name)),
        _ => None,
    }
}
