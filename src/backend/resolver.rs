//! Turning placeholder names into values by walking candidate backends.
//!
//! Candidate order per name: explicit mappings (most-recently-set first),
//! then the configured default backend, then the local store. The first
//! candidate that produces a value wins; no attempt is made to reconcile
//! conflicting values across backends. Unresolved names are data, never an
//! error - only callers decide whether they are fatal.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::mapping::MappingStore;
use super::{BackendKind, BackendRegistry, BackendStatus};

/// Options for one resolution pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOpts {
    /// Set by unattended flows: a backend that is installed but needs
    /// interactive authentication leaves its names unresolved instead of
    /// ever blocking on a prompt.
    pub fail_on_auth_required: bool,
}

/// Aggregate result of resolving a set of names.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub map: BTreeMap<String, String>,
    /// Names no candidate backend could resolve, in request order.
    pub unresolved: Vec<String>,
    /// Backends that were skipped because they need authentication; lets an
    /// interactive caller tell the user what to unlock before retrying.
    pub auth_required: BTreeSet<BackendKind>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

pub struct Resolver {
    registry: BackendRegistry,
    mappings: MappingStore,
    default_backend: BackendKind,
}

impl Resolver {
    pub fn new(
        registry: BackendRegistry,
        mappings: MappingStore,
        default_backend: BackendKind,
    ) -> Self {
        Resolver {
            registry,
            mappings,
            default_backend,
        }
    }

    /// Resolve each requested name through its candidate backends.
    pub async fn resolve_to_map(&self, names: &[String], opts: ResolveOpts) -> Resolution {
        let mut resolution = Resolution::default();
        let mut requested = HashSet::new();

        for name in names {
            if !requested.insert(name.clone()) {
                continue;
            }

            let mut resolved = false;
            let mut tried = HashSet::new();

            for (kind, backend_path) in self.candidates(name) {
                if !tried.insert(kind) {
                    continue;
                }
                let Some(backend) = self.registry.get(kind) else {
                    continue;
                };
                if !backend.is_available().await {
                    continue;
                }
                if !backend.is_authenticated().await {
                    if !opts.fail_on_auth_required {
                        resolution.auth_required.insert(kind);
                    }
                    continue;
                }
                match backend.resolve(name, backend_path.as_deref()).await {
                    Ok(Some(value)) => {
                        resolution.map.insert(name.clone(), value);
                        resolved = true;
                        break;
                    }
                    // "No value" and adapter failure both mean: next
                    // candidate.
                    Ok(None) | Err(_) => continue,
                }
            }

            if !resolved {
                resolution.unresolved.push(name.clone());
            }
        }

        resolution
    }

    /// Candidate `(backend, path)` pairs for one name, in preference order.
    fn candidates(&self, name: &str) -> Vec<(BackendKind, Option<String>)> {
        let mut candidates: Vec<(BackendKind, Option<String>)> = self
            .mappings
            .candidates_for(name)
            .into_iter()
            .map(|m| (m.backend, m.backend_path))
            .collect();
        candidates.push((self.default_backend, None));
        candidates.push((BackendKind::Local, None));
        candidates
    }

    /// Availability and authentication for every registered backend.
    pub async fn backend_statuses(&self) -> Vec<BackendStatus> {
        let mut statuses = Vec::new();
        for backend in self.registry.iter() {
            statuses.push(BackendStatus {
                kind: backend.kind(),
                display_name: backend.display_name(),
                available: backend.is_available().await,
                authenticated: backend.is_authenticated().await,
                is_default: backend.kind() == self.default_backend,
            });
        }
        statuses
    }

    pub fn default_backend(&self) -> BackendKind {
        self.default_backend
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }
}
