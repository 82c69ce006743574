//! In-memory manager used by the scenario tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rsw_reconcile::*;

pub const PRIMARY_PATH: &str = "/infra/tier-1s/t1-site-a";
pub const DR_PATH: &str = "/infra/tier-1s/t1-site-b";
pub const PRIMARY_ID: &str = "2b1c5e0a-0001";
pub const DR_ID: &str = "2b1c5e0a-0002";

pub fn set(items: &[&str]) -> AdvertisementSet {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn params() -> ParameterSet {
    ParameterSet {
        primary_identifier: PRIMARY_ID.to_string(),
        dr_identifier: DR_ID.to_string(),
        identity_strategy: IdentityStrategy::UniqueId,
    }
}

pub fn baseline(primary: &[&str], dr: &[&str]) -> Baseline {
    Baseline {
        primary: RouterState::new(1, "t1-site-a", primary.iter().copied()),
        dr: RouterState::new(1, "t1-site-b", dr.iter().copied()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Fetch(String),
    Apply(String, RouterPatch),
}

/// Fake manager: a router table plus injectable failures. Applies enforce
/// the revision and bump it, as the real manager does.
pub struct FakeManager {
    candidates: Vec<RouterCandidate>,
    routers: Mutex<BTreeMap<String, RouterState>>,
    list_error: Option<TransportError>,
    fetch_errors: BTreeMap<String, TransportError>,
    apply_errors: BTreeMap<String, TransportError>,
    calls: Mutex<Vec<Call>>,
}

impl FakeManager {
    /// Primary at revision 10, DR at revision 20.
    pub fn pair(primary: &[&str], dr: &[&str]) -> Self {
        let mut routers = BTreeMap::new();
        routers.insert(
            PRIMARY_PATH.to_string(),
            RouterState::new(10, "t1-site-a", primary.iter().copied()),
        );
        routers.insert(
            DR_PATH.to_string(),
            RouterState::new(20, "t1-site-b", dr.iter().copied()),
        );
        Self {
            candidates: vec![
                RouterCandidate::new(PRIMARY_ID, "t1-site-a", PRIMARY_PATH),
                RouterCandidate::new(DR_ID, "t1-site-b", DR_PATH),
            ],
            routers: Mutex::new(routers),
            list_error: None,
            fetch_errors: BTreeMap::new(),
            apply_errors: BTreeMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<RouterCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn fail_list(mut self, err: TransportError) -> Self {
        self.list_error = Some(err);
        self
    }

    pub fn fail_fetch(mut self, path: &str, err: TransportError) -> Self {
        self.fetch_errors.insert(path.to_string(), err);
        self
    }

    pub fn fail_apply(mut self, path: &str, err: TransportError) -> Self {
        self.apply_errors.insert(path.to_string(), err);
        self
    }

    pub fn state(&self, path: &str) -> RouterState {
        self.routers.lock().unwrap()[path].clone()
    }

    /// Out-of-band change, as another operator would make.
    pub fn touch(&self, path: &str) {
        let mut routers = self.routers.lock().unwrap();
        if let Some(r) = routers.get_mut(path) {
            r.revision += 1;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applies(&self) -> Vec<(String, RouterPatch)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply(path, patch) => Some((path, patch)),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(_)))
            .count()
    }
}

#[async_trait]
impl RouterTransport for FakeManager {
    async fn list_routers(&self) -> Result<Vec<RouterCandidate>, TransportError> {
        self.calls.lock().unwrap().push(Call::List);
        match &self.list_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.candidates.clone()),
        }
    }

    async fn fetch_router(&self, path: &str) -> Result<RouterState, TransportError> {
        self.calls.lock().unwrap().push(Call::Fetch(path.to_string()));
        if let Some(e) = self.fetch_errors.get(path) {
            return Err(e.clone());
        }
        self.routers
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(path.to_string()))
    }

    async fn apply_router(
        &self,
        path: &str,
        patch: &RouterPatch,
    ) -> Result<RouterState, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Apply(path.to_string(), patch.clone()));
        if let Some(e) = self.apply_errors.get(path) {
            return Err(e.clone());
        }

        let mut routers = self.routers.lock().unwrap();
        let current = routers
            .get_mut(path)
            .ok_or_else(|| TransportError::NotFound(path.to_string()))?;
        if current.revision != patch.revision {
            return Err(TransportError::RevisionConflict(format!(
                "{path}: have {} got {}",
                current.revision, patch.revision
            )));
        }
        current.revision += 1;
        current.display_name = patch.display_name.clone();
        current.route_advertisement_types = patch.route_advertisement_types.clone();
        Ok(current.clone())
    }
}
