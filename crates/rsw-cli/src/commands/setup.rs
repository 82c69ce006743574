use anyhow::{bail, Context, Result};
use std::io::{BufRead, IsTerminal, Write};

use rsw_config::{password_from_env, ResolvedPassword};
use rsw_reconcile::{IdentityStrategy, ParameterSet};
use rsw_store::StoredCredentials;

use super::{Outcome, Session};

pub fn set_user(session: &Session, username: &str, host: &str) -> Result<Outcome> {
    if username.trim().is_empty() || host.trim().is_empty() {
        bail!("--username and --host must not be empty");
    }

    let var = &session.settings.credentials.password_env;
    let password = match password_from_env(var) {
        Some(p) => p,
        None => read_password_stdin(var)?,
    };
    tracing::info!(source = password.source(), "manager password resolved");

    let creds = StoredCredentials::from_password(username.trim(), host.trim(), password.expose());
    let path = session.state.write_credentials(&creds)?;

    println!(
        "Credentials stored for {}@{} ({})",
        creds.username,
        creds.target_host,
        path.display()
    );
    Ok(Outcome::Done)
}

/// First line of stdin. Prompts only when stdin is a terminal.
fn read_password_stdin(env_name: &str) -> Result<ResolvedPassword> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Manager password (or set {env_name}): ");
        std::io::stderr().flush().ok();
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("read password from stdin failed")?;
    let password = line.trim_end_matches(&['\r', '\n'][..]);
    if password.is_empty() {
        bail!("no password given: set {env_name} or pipe it on stdin");
    }
    Ok(ResolvedPassword::new(password, "stdin"))
}

pub fn set_params(
    session: &Session,
    primary: &str,
    dr: &str,
    strategy: IdentityStrategy,
) -> Result<Outcome> {
    let params = ParameterSet {
        primary_identifier: primary.trim().to_string(),
        dr_identifier: dr.trim().to_string(),
        identity_strategy: strategy,
    };
    let path = session.state.write_parameters(&params)?;

    println!(
        "Parameters stored: primary={} dr={} strategy={} ({})",
        params.primary_identifier,
        params.dr_identifier,
        strategy.as_str(),
        path.display()
    );
    Ok(Outcome::Done)
}
