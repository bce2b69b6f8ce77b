// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RFB "VNC Authentication" security type: a 16-byte DES challenge-response.
//!
//! The wire algorithm is fixed by the protocol (RFC 6143 §7.2.2): the server
//! sends a random 16-byte challenge, the client DES-encrypts it in two 8-byte
//! blocks using the password (truncated/zero-padded to 8 bytes, with each key
//! byte bit-reversed, a quirk inherited from the original RealVNC
//! implementation), and sends the 16-byte result back.
//!
//! [`VncAuth`] additionally supports more than one configured password, with
//! the first one treated as the full-control password and any additional
//! ones as view-only passwords, mirroring `libvncserver`'s
//! `rfbAuthenticate`/`-viewonlypasswd` behaviour.

use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;
use rand::RngCore;

/// Length in bytes of the DES challenge and response.
pub const CHALLENGE_LEN: usize = 16;

/// Outcome of a successful authentication: which configured password matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Index into the credential list that matched, 0 being full control.
    pub credential_index: usize,
    /// `true` if the matched password grants view-only access (input events
    /// from this client should be silently discarded by the host).
    pub view_only: bool,
}

/// A configured VNC Authentication challenge-response verifier.
///
/// Holds zero or more candidate passwords. Index 0, if present, is the
/// full-control password; any further entries are tried as view-only
/// passwords. A freshly generated challenge must be verified at most once;
/// callers should discard it after the first `verify` call regardless of
/// outcome.
#[derive(Debug, Clone, Default)]
pub struct VncAuth {
    passwords: Vec<String>,
}

impl VncAuth {
    /// Creates a verifier with a single full-control password.
    #[must_use]
    pub fn new(password: String) -> Self {
        Self {
            passwords: vec![password],
        }
    }

    /// Creates a verifier from an ordered list of passwords: the first is
    /// full control, the rest are view-only.
    #[must_use]
    pub fn with_passwords(passwords: Vec<String>) -> Self {
        Self { passwords }
    }

    /// `true` if at least one password is configured, i.e. VNC Authentication
    /// should be offered instead of the `None` security type.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.passwords.is_empty()
    }

    /// Generates a fresh random 16-byte challenge to send to the client.
    #[must_use]
    pub fn generate_challenge(&self) -> [u8; CHALLENGE_LEN] {
        let mut challenge = [0u8; CHALLENGE_LEN];
        rand::thread_rng().fill_bytes(&mut challenge);
        challenge
    }

    /// Verifies a client's 16-byte response against a previously issued
    /// challenge, returning the matching credential on success.
    #[must_use]
    pub fn verify_response(
        &self,
        response: &[u8],
        challenge: &[u8; CHALLENGE_LEN],
    ) -> Option<AuthOutcome> {
        if response.len() != CHALLENGE_LEN {
            return None;
        }
        for (index, password) in self.passwords.iter().enumerate() {
            let expected = des_encrypt_challenge(password, challenge);
            if expected == response {
                return Some(AuthOutcome {
                    credential_index: index,
                    view_only: index > 0,
                });
            }
        }
        None
    }
}

/// Encrypts `challenge` with the DES key derived from `password`, per the
/// RFB VNC Authentication scheme: the password is truncated or zero-padded
/// to 8 bytes, and each key byte has its bits reversed before use as the DES
/// key (a historical artifact of the bit ordering VNC inherited from its
/// original Pascal implementation).
fn des_encrypt_challenge(password: &str, challenge: &[u8; CHALLENGE_LEN]) -> [u8; CHALLENGE_LEN] {
    let mut key = [0u8; 8];
    for (i, b) in password.as_bytes().iter().take(8).enumerate() {
        key[i] = reverse_bits(*b);
    }
    let cipher = Des::new_from_slice(&key).expect("DES key is always exactly 8 bytes");

    let mut out = [0u8; CHALLENGE_LEN];
    for (chunk_out, chunk_in) in out.chunks_mut(8).zip(challenge.chunks(8)) {
        let mut block = des::cipher::generic_array::GenericArray::clone_from_slice(chunk_in);
        cipher.encrypt_block(&mut block);
        chunk_out.copy_from_slice(&block);
    }
    out
}

fn reverse_bits(mut b: u8) -> u8 {
    let mut r = 0u8;
    for _ in 0..8 {
        r = (r << 1) | (b & 1);
        b >>= 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_control_password_matches_index_zero() {
        let auth = VncAuth::new("hunter2".to_string());
        let challenge = [7u8; CHALLENGE_LEN];
        let response = des_encrypt_challenge("hunter2", &challenge);
        let outcome = auth.verify_response(&response, &challenge).unwrap();
        assert_eq!(outcome.credential_index, 0);
        assert!(!outcome.view_only);
    }

    #[test]
    fn view_only_password_is_flagged() {
        let auth = VncAuth::with_passwords(vec!["full".to_string(), "viewer".to_string()]);
        let challenge = [3u8; CHALLENGE_LEN];
        let response = des_encrypt_challenge("viewer", &challenge);
        let outcome = auth.verify_response(&response, &challenge).unwrap();
        assert_eq!(outcome.credential_index, 1);
        assert!(outcome.view_only);
    }

    #[test]
    fn wrong_password_fails() {
        let auth = VncAuth::new("correct".to_string());
        let challenge = [1u8; CHALLENGE_LEN];
        let response = des_encrypt_challenge("wrong", &challenge);
        assert!(auth.verify_response(&response, &challenge).is_none());
    }

    #[test]
    fn unconfigured_auth_rejects_everything() {
        let auth = VncAuth::default();
        assert!(!auth.is_configured());
        let challenge = [0u8; CHALLENGE_LEN];
        assert!(auth.verify_response(&[0u8; CHALLENGE_LEN], &challenge).is_none());
    }

    #[test]
    fn passwords_longer_than_eight_bytes_truncate() {
        let auth = VncAuth::new("0123456789".to_string());
        let challenge = [9u8; CHALLENGE_LEN];
        // Only the first 8 bytes participate in the key.
        let response = des_encrypt_challenge("01234567", &challenge);
        assert!(auth.verify_response(&response, &challenge).is_some());
    }
}
