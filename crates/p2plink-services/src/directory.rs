//! Service directory: which name prefixes the daemon is looking for and
//! which fine-grained DNS-SD requests are outstanding with the OS.
//!
//! Everything stored here is in encoded form (see [`p2plink_core::name`]).

use std::sync::Arc;

use tokio::sync::Mutex;

use p2plink_core::decode_name;

/// Prefix that matches every instance name.
pub const WILDCARD: &str = "*";

/// Strip a wildcard from a find request. Only a `*` that is not the first
/// character is stripped, along with anything after it.
pub fn strip_wildcard(prefix: &str) -> &str {
    match prefix.rfind('*') {
        Some(idx) if idx > 0 => &prefix[..idx],
        _ => prefix,
    }
}

#[derive(Clone, Default)]
pub struct ServiceDirectory {
    /// Encoded instance names with an outstanding OS service request.
    service_requests: Arc<Mutex<Vec<String>>>,
    /// Encoded prefixes the daemon asked to find.
    requested_names: Arc<Mutex<Vec<String>>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Requested prefixes ────────────────────────────────────────────────────

    /// Record a prefix. Returns `false` if it was already requested.
    pub async fn request_name(&self, encoded_prefix: &str) -> bool {
        let mut names = self.requested_names.lock().await;
        if names.iter().any(|n| n == encoded_prefix) {
            return false;
        }
        names.push(encoded_prefix.to_string());
        true
    }

    pub async fn forget_name(&self, encoded_prefix: &str) -> bool {
        let mut names = self.requested_names.lock().await;
        match names.iter().position(|n| n == encoded_prefix) {
            Some(i) => {
                names.remove(i);
                true
            }
            None => false,
        }
    }

    pub async fn has_requested_names(&self) -> bool {
        !self.requested_names.lock().await.is_empty()
    }

    pub async fn requested_names(&self) -> Vec<String> {
        self.requested_names.lock().await.clone()
    }

    /// Whether any requested prefix matches this encoded instance name.
    pub async fn wants_instance(&self, instance_name: &str) -> bool {
        self.requested_names
            .lock()
            .await
            .iter()
            .any(|p| p == WILDCARD || instance_name.starts_with(p.as_str()))
    }

    // ── Outstanding service requests ──────────────────────────────────────────

    /// Record a fine-grained request. Returns `false` if already tracked.
    pub async fn track_request(&self, instance_name: &str) -> bool {
        let mut reqs = self.service_requests.lock().await;
        if reqs.iter().any(|r| r == instance_name) {
            return false;
        }
        reqs.push(instance_name.to_string());
        true
    }

    pub async fn untrack_request(&self, instance_name: &str) -> bool {
        let mut reqs = self.service_requests.lock().await;
        match reqs.iter().position(|r| r == instance_name) {
            Some(i) => {
                reqs.remove(i);
                true
            }
            None => false,
        }
    }

    pub async fn is_tracked(&self, instance_name: &str) -> bool {
        self.service_requests
            .lock()
            .await
            .iter()
            .any(|r| r == instance_name)
    }

    /// Remove and return the first tracked request starting with `prefix`.
    pub async fn take_request_with_prefix(&self, prefix: &str) -> Option<String> {
        let mut reqs = self.service_requests.lock().await;
        let i = reqs.iter().position(|r| r.starts_with(prefix))?;
        Some(reqs.remove(i))
    }

    /// Decoded prefix a TXT record's full domain name answers.
    ///
    /// The first tracked request that prefixes the domain (case-sensitively)
    /// selects the record; the first requested prefix that request satisfies,
    /// `*` included, is what gets reported. A request whose prefix has since
    /// been cancelled reports itself.
    pub async fn prefix_for(&self, full_domain_name: &str) -> Option<String> {
        let request = self
            .service_requests
            .lock()
            .await
            .iter()
            .find(|r| full_domain_name.starts_with(r.as_str()))
            .cloned()?;
        let names = self.requested_names.lock().await;
        let prefix = names
            .iter()
            .find(|p| p.as_str() == WILDCARD || request.starts_with(p.as_str()))
            .unwrap_or(&request);
        Some(decode_name(prefix))
    }

    pub async fn clear_requests(&self) {
        self.service_requests.lock().await.clear();
    }

    pub async fn clear_all(&self) {
        self.service_requests.lock().await.clear();
        self.requested_names.lock().await.clear();
    }

    /// (outstanding requests, requested prefixes)
    pub async fn counts(&self) -> (usize, usize) {
        let reqs = self.service_requests.lock().await.len();
        let names = self.requested_names.lock().await.len();
        (reqs, names)
    }
}
