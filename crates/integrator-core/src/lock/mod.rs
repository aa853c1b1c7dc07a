//! Change ledger
//!
//! The lock file records, per class, which methods were mutated and with what
//! fingerprint. Re-running the integrator consults it to skip work that is
//! already done and to revert mutations that are no longer requested.
//!
//! ```json
//! {
//!   "Pyz\\Zed\\Shop\\ShopDependencyProvider": {
//!     "getShopPlugins": "override:5c5b7f8b4be0b1a2",
//!     "isEnabled": "set-return-value:0b1c2d3e4f506172:preexisting"
//!   }
//! }
//! ```
//!
//! A `:preexisting` suffix marks a method that was already in the class when
//! it was first mutated. Reverting such an entry leaves the method in place.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{IntegratorError, Result};

/// Opaque `<action>:<digest>` string identifying one applied mutation.
pub type Fingerprint = String;

/// Class name -> method name -> fingerprint. Sorted maps keep the file stable.
pub type LockData = BTreeMap<String, BTreeMap<String, Fingerprint>>;

/// Action name recorded in front of a fingerprint.
pub fn fingerprint_action(fingerprint: &str) -> &str {
    fingerprint
        .split_once(':')
        .map_or(fingerprint, |(action, _)| action)
}

/// Origin marker of a method the integrator did not create.
const PREEXISTING: &str = ":preexisting";

/// Fingerprint without its origin marker, as produced by the manifest.
pub fn fingerprint_digest(fingerprint: &str) -> &str {
    fingerprint.strip_suffix(PREEXISTING).unwrap_or(fingerprint)
}

pub fn is_preexisting(fingerprint: &str) -> bool {
    fingerprint.ends_with(PREEXISTING)
}

pub fn mark_preexisting(fingerprint: &str) -> Fingerprint {
    format!("{}{PREEXISTING}", fingerprint_digest(fingerprint))
}

pub struct LockReader {
    path: PathBuf,
}

impl LockReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger. A file that does not exist yet is an empty ledger.
    pub fn load(&self) -> Result<LockData> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No lock file yet");
                return Ok(LockData::new());
            }
            Err(source) => {
                return Err(IntegratorError::LockIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(LockData::new());
        }
        serde_json::from_str(&text).map_err(|source| IntegratorError::LockFormat {
            path: self.path.clone(),
            source,
        })
    }
}

pub struct LockWriter {
    path: PathBuf,
}

impl LockWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the ledger in its canonical form. No retry, no rename: a failed
    /// write leaves whatever reached the disk.
    pub fn store(&self, data: &LockData) -> Result<()> {
        let text = render(data).map_err(|source| IntegratorError::LockFormat {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|source| IntegratorError::LockIo {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), classes = data.len(), "Lock file written");
        Ok(())
    }
}

/// Canonical text of a ledger: two-space indentation, sorted keys, slashes
/// left unescaped, trailing newline.
pub fn render(data: &LockData) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(data)?;
    text.push('\n');
    Ok(text)
}

/// What to do with one method of a class on this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Requested, not recorded yet
    Apply,
    /// Requested and recorded under a different fingerprint
    Reapply { recorded: Fingerprint },
    /// Requested and recorded identically
    Skip,
    /// Recorded but no longer requested
    Revert { recorded: Fingerprint },
}

/// Per-class comparison of requested mutations with the recorded ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPlan {
    pub class_name: String,
    /// Reverts first, in ledger order, then requests in manifest order.
    pub steps: Vec<(String, PlanStep)>,
    /// Fingerprints to record once the class went through. Origin markers of
    /// recorded methods carry over; new methods are recorded unmarked.
    pub entry: BTreeMap<String, Fingerprint>,
}

impl LockPlan {
    pub fn for_class(
        class_name: &str,
        requested: &[(String, Fingerprint)],
        recorded: Option<&BTreeMap<String, Fingerprint>>,
    ) -> Self {
        let empty = BTreeMap::new();
        let recorded = recorded.unwrap_or(&empty);

        let mut steps: Vec<(String, PlanStep)> = recorded
            .iter()
            .filter(|(method, _)| !requested.iter().any(|(name, _)| name == *method))
            .map(|(method, fingerprint)| {
                (
                    method.clone(),
                    PlanStep::Revert {
                        recorded: fingerprint.clone(),
                    },
                )
            })
            .collect();

        let mut entry = BTreeMap::new();
        for (method, fingerprint) in requested {
            let (step, recorded_as) = match recorded.get(method) {
                None => (PlanStep::Apply, fingerprint.clone()),
                Some(previous) if fingerprint_digest(previous) == fingerprint => {
                    (PlanStep::Skip, previous.clone())
                }
                Some(previous) => {
                    let recorded_as = if is_preexisting(previous) {
                        mark_preexisting(fingerprint)
                    } else {
                        fingerprint.clone()
                    };
                    (
                        PlanStep::Reapply {
                            recorded: previous.clone(),
                        },
                        recorded_as,
                    )
                }
            };
            steps.push((method.clone(), step));
            entry.insert(method.clone(), recorded_as);
        }

        Self {
            class_name: class_name.to_string(),
            steps,
            entry,
        }
    }

    /// True when every method is already in its recorded state.
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|(_, step)| *step == PlanStep::Skip)
    }

    pub fn count(&self, matches: impl Fn(&PlanStep) -> bool) -> usize {
        self.steps.iter().filter(|(_, step)| matches(step)).count()
    }
}
