// src/core/identity/types.rs
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A fixed-dimension feature vector produced by an embedding provider.
pub type Embedding = Vec<f32>;

/// Label attached to a face or a voice. `Unknown` is never an enrolled
/// person, even if someone enrolled under the literal name "Unknown".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    Known(String),
    Unknown,
}

impl Identity {
    pub fn known(name: impl Into<String>) -> Self {
        Identity::Known(name.into())
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            Identity::Known(name) => Some(name),
            Identity::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Known(name) => f.write_str(name),
            Identity::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Distinct known identities recognized during one face window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentitySet(BTreeSet<String>);

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the name was not present yet.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for IdentitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for IdentitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Face location in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Outcome of scoring one voice sample against the template catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub identity: Identity,
    /// Best score of the accepted candidate, or the best score seen overall
    /// when nothing passed.
    pub score: f32,
    pub threshold: f32,
    pub passed: bool,
    /// Set when scoring degraded because a provider failed. Not consulted
    /// by the decision, only reported.
    pub failure: Option<String>,
}

impl MatchResult {
    pub fn accepted(identity: impl Into<String>, score: f32, threshold: f32) -> Self {
        Self {
            identity: Identity::known(identity),
            score,
            threshold,
            passed: true,
            failure: None,
        }
    }

    pub fn no_match(best_score: f32, threshold: f32) -> Self {
        Self {
            identity: Identity::Unknown,
            score: best_score,
            threshold,
            passed: false,
            failure: None,
        }
    }

    pub fn degraded(threshold: f32, failure: impl Into<String>) -> Self {
        Self {
            identity: Identity::Unknown,
            score: 0.0,
            threshold,
            passed: false,
            failure: Some(failure.into()),
        }
    }
}

/// Final decision of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AuthenticationVerdict {
    Authenticated { identity: String },
    RejectedNoFace,
    RejectedNoVoiceMatch,
    RejectedMismatch { voice_identity: String },
    RejectedError { detail: String },
}

impl AuthenticationVerdict {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationVerdict::Authenticated { .. })
    }

    /// The identity the verdict is about, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            AuthenticationVerdict::Authenticated { identity } => Some(identity),
            AuthenticationVerdict::RejectedMismatch { voice_identity } => Some(voice_identity),
            _ => None,
        }
    }

    /// Short machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthenticationVerdict::Authenticated { .. } => "authenticated",
            AuthenticationVerdict::RejectedNoFace => "no_face",
            AuthenticationVerdict::RejectedNoVoiceMatch => "no_voice_match",
            AuthenticationVerdict::RejectedMismatch { .. } => "mismatch",
            AuthenticationVerdict::RejectedError { .. } => "error",
        }
    }

    /// The one message shown to the person at the door.
    pub fn message(&self) -> String {
        match self {
            AuthenticationVerdict::Authenticated { identity } => {
                format!("authenticated as {}", identity)
            }
            AuthenticationVerdict::RejectedNoFace => "no recognized face".to_string(),
            AuthenticationVerdict::RejectedNoVoiceMatch => "voice not recognized".to_string(),
            AuthenticationVerdict::RejectedMismatch { voice_identity } => format!(
                "face and voice identify different people (voice: {})",
                voice_identity
            ),
            AuthenticationVerdict::RejectedError { detail } => {
                format!("authentication error: {}", detail)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    Closed,
    Opened,
    /// Actuator unreachable or not initialized yet.
    Unknown,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DoorState::Closed => "closed",
            DoorState::Opened => "opened",
            DoorState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}
