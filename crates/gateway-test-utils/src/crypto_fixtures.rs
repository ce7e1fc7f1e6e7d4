//! Signing keys and forged tokens.
//!
//! Ed25519 keys are generated per test. The RSA key is a checked-in 2048-bit
//! fixture, since generating one per test is slow and `ring` cannot do it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::hmac;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};

/// An Ed25519 signing key with a key id.
pub struct TestKeypair {
    kid: String,
    pkcs8: Vec<u8>,
    public_x: String,
}

impl TestKeypair {
    /// Generate a fresh keypair published under `kid`.
    pub fn generate(kid: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).expect("Ed25519 keygen");
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).expect("parse pkcs8");
        Self {
            kid: kid.to_string(),
            pkcs8: pkcs8.as_ref().to_vec(),
            public_x: URL_SAFE_NO_PAD.encode(key_pair.public_key().as_ref()),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public JWK as published by a JWKS endpoint.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "alg": "EdDSA",
            "use": "sig",
            "x": self.public_x,
        })
    }

    /// Sign `claims` with this key and its own `kid`.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_as(&self.kid, claims)
    }

    /// Sign `claims` with this key but advertise a different `kid`.
    pub fn sign_as(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &EncodingKey::from_ed_der(&self.pkcs8)).expect("sign token")
    }
}

/// Checked-in RSA private key (PKCS#8 PEM). Test use only.
const RSA_TEST_KEY_PEM: &str = include_str!("../fixtures/rsa_test_key.pem");

/// Public modulus and exponent of [`RSA_TEST_KEY_PEM`], base64url.
const RSA_TEST_KEY_COMPONENTS: &str = include_str!("../fixtures/rsa_test_key.jwk.json");

/// The fixture RSA key, published under a key id.
pub struct RsaTestKeypair {
    kid: String,
    n: String,
    e: String,
}

impl RsaTestKeypair {
    pub fn load(kid: &str) -> Self {
        let components: Value =
            serde_json::from_str(RSA_TEST_KEY_COMPONENTS).expect("parse RSA fixture components");
        Self {
            kid: kid.to_string(),
            n: components["n"].as_str().expect("fixture n").to_string(),
            e: components["e"].as_str().expect("fixture e").to_string(),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public JWK pinned to `alg`.
    pub fn jwk_json(&self, alg: Algorithm) -> Value {
        let mut jwk = self.jwk_json_without_alg();
        jwk["alg"] = json!(format!("{alg:?}"));
        jwk
    }

    /// Public JWK without an `alg` member (optional per RFC 7517).
    pub fn jwk_json_without_alg(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "n": self.n,
            "e": self.e,
        })
    }

    /// Sign `claims` with `alg` (any RS* or PS* algorithm).
    pub fn sign(&self, alg: Algorithm, claims: &Value) -> String {
        let mut header = Header::new(alg);
        header.kid = Some(self.kid.clone());
        let key = EncodingKey::from_rsa_pem(RSA_TEST_KEY_PEM.as_bytes()).expect("parse RSA PEM");
        encode(&header, claims, &key).expect("sign RSA token")
    }
}

/// A JWKS document (`{"keys": [...]}`) publishing `keys`.
pub fn jwks_document(keys: &[&TestKeypair]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>() })
}

/// A token with `alg: none` and an empty signature segment.
pub fn unsigned_token(kid: &str, claims: &Value) -> String {
    let header = json!({ "alg": "none", "typ": "JWT", "kid": kid });
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// An HS256 token keyed with `secret`, for algorithm confusion attempts.
pub fn hs256_token(kid: &str, secret: &[u8], claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(secret)).expect("sign HS256 token")
}

/// Lowercase hex HMAC-SHA256 of `body`, as a partner would send it.
pub fn sign_webhook(body: &[u8], secret: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hex::encode(hmac::sign(&key, body).as_ref())
}
