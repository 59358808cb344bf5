// src/core/services/fusion.rs
use crate::core::identity::{AuthenticationVerdict, Identity, IdentitySet, MatchResult};

/// Combines the face window and the voice match into one verdict.
///
/// The voice decides who is speaking; the face set only has to contain
/// that person. Rules are checked in order: no face, no voice match,
/// voice identity seen on camera, otherwise a mismatch.
pub fn fuse(faces: &IdentitySet, voice: &MatchResult) -> AuthenticationVerdict {
    if faces.is_empty() {
        return AuthenticationVerdict::RejectedNoFace;
    }

    let speaker = match (&voice.identity, voice.passed) {
        (Identity::Known(name), true) => name,
        _ => return AuthenticationVerdict::RejectedNoVoiceMatch,
    };

    if faces.contains(speaker) {
        AuthenticationVerdict::Authenticated {
            identity: speaker.clone(),
        }
    } else {
        AuthenticationVerdict::RejectedMismatch {
            voice_identity: speaker.clone(),
        }
    }
}
