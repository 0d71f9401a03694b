//! Curve25519 key newtypes with base64 wire encodings.
//!
//! `wireguard_control::Key` carries both public and secret material; the two
//! wrappers here keep them apart at the type level and give them the JSON
//! representation clients exchange (plain base64 strings).
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use wireguard_control::Key;

/// A peer or gateway public key.
#[derive(Clone)]
pub struct PublicKey(Key);

impl PublicKey {
    pub fn from_base64(s: &str) -> Result<Self, String> {
        Key::from_base64(s)
            .map(Self)
            .map_err(|err| format!("invalid public key: {:?}", err))
    }

    pub fn to_base64(&self) -> String {
        self.0.to_base64()
    }

    pub fn as_key(&self) -> &Key {
        &self.0
    }
}

impl From<Key> for PublicKey {
    fn from(key: Key) -> Self {
        Self(key)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 .0 == other.0 .0
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0 .0);
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(de::Error::custom)
    }
}

/// A private or preshared key. Never logged; `Debug` is redacted.
#[derive(Clone)]
pub struct SecretKey(Key);

impl SecretKey {
    pub fn generate_private() -> Self {
        Self(Key::generate_private())
    }

    pub fn generate_preshared() -> Self {
        Self(Key::generate_preshared())
    }

    /// The public half of a private key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.get_public())
    }

    pub fn to_base64(&self) -> String {
        self.0.to_base64()
    }

    pub fn as_key(&self) -> &Key {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Key::from_base64(&s)
            .map(Self)
            .map_err(|err| de::Error::custom(format!("invalid key: {:?}", err)))
    }
}
