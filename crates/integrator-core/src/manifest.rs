//! Manifest: the mutations a project asks for.
//!
//! ```json
//! {
//!   "Pyz\\Zed\\Shop\\ShopDependencyProvider": {
//!     "getShopPlugins": { "action": "override" },
//!     "isEnabled": { "action": "set-return-value", "value": true },
//!     "getLimit": {
//!       "action": "set-return-value",
//!       "value": { "is_literal": true, "value": "static::LIMIT * 2" }
//!     },
//!     "provide": { "action": "replace-body", "body": "return $container;" },
//!     "getLegacyPlugins": { "action": "remove" }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::builder::{MutationRequest, ReturnValue};
use crate::lock::Fingerprint;
use crate::parser::Parser;
use crate::{IntegratorError, Result};

/// Hex digits of the digest kept in a fingerprint.
const DIGEST_LEN: usize = 16;

/// One requested mutation of one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ManifestAction {
    Override,
    ReplaceBody { body: String },
    Remove,
    SetReturnValue { value: Value },
}

impl ManifestAction {
    pub fn name(&self) -> &'static str {
        match self {
            ManifestAction::Override => "override",
            ManifestAction::ReplaceBody { .. } => "replace-body",
            ManifestAction::Remove => "remove",
            ManifestAction::SetReturnValue { .. } => "set-return-value",
        }
    }

    /// Turns the entry into a request for `method`. Replacement bodies are
    /// parsed here, so a broken body fails before anything is touched.
    pub fn to_request(&self, parser: &dyn Parser, method: &str) -> Result<MutationRequest> {
        let method = method.to_string();
        Ok(match self {
            ManifestAction::Override => MutationRequest::OverrideFromParent { method },
            ManifestAction::ReplaceBody { body } => MutationRequest::ReplaceBody {
                method,
                stmts: parser.parse_statements(body)?,
            },
            ManifestAction::Remove => MutationRequest::RemoveMethod { method },
            ManifestAction::SetReturnValue { value } => MutationRequest::SetReturnValue {
                method,
                value: ReturnValue::from_json(value.clone()),
            },
        })
    }

    /// `<action>:<digest>`, where the digest is the leading 16 hex digits of
    /// the SHA-256 of the entry's JSON with object keys sorted. Key order in
    /// the manifest does not matter.
    pub fn fingerprint(&self) -> Fingerprint {
        let canonical = serde_json::to_value(self)
            .map(|value| canonical(&value).to_string())
            .unwrap_or_default();
        let mut digest = content_hash(canonical.as_bytes());
        digest.truncate(DIGEST_LEN);
        format!("{}:{digest}", self.name())
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Class name -> method name -> action, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    classes: IndexMap<String, IndexMap<String, ManifestAction>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|error| IntegratorError::Manifest {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        Self::parse(&text).map_err(|error| IntegratorError::Manifest {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
    }

    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let mut manifest: Manifest = serde_json::from_str(text)?;
        manifest.classes = manifest
            .classes
            .into_iter()
            .map(|(class, methods)| (class.trim_start_matches('\\').to_string(), methods))
            .collect();
        Ok(manifest)
    }

    pub fn insert(&mut self, class_name: &str, method: &str, action: ManifestAction) {
        self.classes
            .entry(class_name.trim_start_matches('\\').to_string())
            .or_default()
            .insert(method.to_string(), action);
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &IndexMap<String, ManifestAction>)> {
        self.classes
            .iter()
            .map(|(class, methods)| (class.as_str(), methods))
    }

    pub fn class(&self, class_name: &str) -> Option<&IndexMap<String, ManifestAction>> {
        self.classes.get(class_name)
    }

    /// Requested `(method, fingerprint)` pairs of one class, in file order.
    pub fn fingerprints(&self, class_name: &str) -> Vec<(String, Fingerprint)> {
        self.class(class_name)
            .map(|methods| {
                methods
                    .iter()
                    .map(|(method, action)| (method.clone(), action.fingerprint()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
