use anyhow::Result;
use std::path::PathBuf;

use rsw_audit::{verify_hash_chain, VerifyResult};

use super::{Outcome, Session};

pub fn verify(session: &Session, path: Option<PathBuf>) -> Result<Outcome> {
    let path = path.unwrap_or_else(|| session.settings.audit_path(session.state.root()));
    match verify_hash_chain(&path)? {
        VerifyResult::Valid { lines } => {
            println!("audit_chain=valid lines={lines} path={}", path.display());
            Ok(Outcome::Done)
        }
        VerifyResult::Broken { line, reason } => {
            println!(
                "audit_chain=broken line={line} path={} reason={reason}",
                path.display()
            );
            Ok(Outcome::Refused)
        }
    }
}
