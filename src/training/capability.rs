//! Capability negotiation against the installed trainer
//!
//! Which optional fit arguments a trainer accepts is discovered once per run,
//! either from the backend's own probe or from [`CAPABILITY_TABLE`] keyed on
//! the trainer's major version. Unknown versions accept nothing optional.

use super::config::{FitOptionKind, FitOptions};
use super::models::TrainerBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Name and version of a trainer implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerInfo {
    pub name: String,
    pub version: String,
}

impl TrainerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Leading numeric component of the version string
    pub fn major_version(&self) -> Option<u32> {
        self.version
            .trim_start_matches('v')
            .split('.')
            .next()?
            .parse()
            .ok()
    }
}

impl fmt::Display for TrainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Set of optional fit arguments a trainer accepts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<FitOptionKind>);

impl CapabilitySet {
    pub fn all() -> Self {
        Self(FitOptionKind::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = FitOptionKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn accepts(&self, kind: FitOptionKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = FitOptionKind> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up `info` in [`CAPABILITY_TABLE`]
    pub fn from_table(info: &TrainerInfo) -> Self {
        let Some(major) = info.major_version() else {
            return Self::none();
        };
        CAPABILITY_TABLE
            .iter()
            .find(|row| row.covers(major))
            .map(|row| Self::from_kinds(row.accepted.iter().copied()))
            .unwrap_or_default()
    }
}

/// Row of the versioned capability table
#[derive(Debug, Clone, Copy)]
pub struct VersionedCapabilities {
    pub min_major: u32,
    /// Inclusive upper bound; `None` is open-ended
    pub max_major: Option<u32>,
    pub accepted: &'static [FitOptionKind],
}

impl VersionedCapabilities {
    fn covers(&self, major: u32) -> bool {
        major >= self.min_major && self.max_major.map_or(true, |max| major <= max)
    }
}

/// Known fit signatures by major version.
///
/// Major 4 removed `early_stopping_rounds` from `fit`; early stopping is only
/// reachable through `callbacks` from then on.
pub const CAPABILITY_TABLE: &[VersionedCapabilities] = &[
    VersionedCapabilities {
        min_major: 2,
        max_major: Some(3),
        accepted: &[
            FitOptionKind::EvalSet,
            FitOptionKind::EarlyStoppingRounds,
            FitOptionKind::Callbacks,
            FitOptionKind::EvalMetric,
            FitOptionKind::CategoricalFeature,
        ],
    },
    VersionedCapabilities {
        min_major: 4,
        max_major: None,
        accepted: &[
            FitOptionKind::EvalSet,
            FitOptionKind::Callbacks,
            FitOptionKind::EvalMetric,
            FitOptionKind::CategoricalFeature,
        ],
    },
];

/// Options left after negotiation and the ones that were dropped
#[derive(Debug, Clone)]
pub struct Negotiated<'a> {
    pub options: FitOptions<'a>,
    pub dropped: Vec<FitOptionKind>,
}

/// Filters candidate fit options down to what the trainer accepts
#[derive(Debug, Clone)]
pub struct CapabilityNegotiator {
    info: TrainerInfo,
    accepted: CapabilitySet,
}

impl CapabilityNegotiator {
    /// Probe the backend
    pub fn probe<B: TrainerBackend + ?Sized>(backend: &B) -> Self {
        let info = backend.info();
        let accepted = backend.accepted_options();
        debug!(
            trainer = %info,
            accepted = ?accepted.iter().map(|k| k.keyword()).collect::<Vec<_>>(),
            "Probed trainer capabilities"
        );
        Self { info, accepted }
    }

    pub fn info(&self) -> &TrainerInfo {
        &self.info
    }

    pub fn accepted(&self) -> &CapabilitySet {
        &self.accepted
    }

    /// Keep only the accepted subset of `candidates`
    pub fn negotiate<'a>(&self, candidates: FitOptions<'a>) -> Negotiated<'a> {
        let mut options = candidates;
        let mut dropped = Vec::new();
        for kind in options.kinds() {
            if !self.accepted.accepts(kind) {
                options = options.without(kind);
                dropped.push(kind);
            }
        }
        Negotiated { options, dropped }
    }
}
