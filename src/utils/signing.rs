// ============================================================================
// TOKENS SIGNÉS (vérification email, changement d'email, reset password)
// ============================================================================
//
// Format (URL-safe, sans padding):
//   <base64url(payload)>:<timestamp unix en hex>:<base64url(signature)>
//
// La signature HMAC couvre exactement le texte "<payload>:<timestamp>".
// Aucun stockage côté serveur: tout est dans le token.
//
// Points d'attention:
//   - La clé vient d'un SigningKey passé explicitement (pas de variable globale)
//   - Chaque usage a son propre salt, un token de signup n'est pas valide
//     comme token de changement d'email
//   - La signature est vérifiée AVANT l'expiration
//
// ============================================================================

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

const SEPARATOR: char = ':';
const KEY_NAMESPACE: &str = "canvas-accounts.signer:";

pub const SIGNUP_SALT: &str = "accounts.signup";
pub const EMAIL_CHANGE_SALT: &str = "accounts.email-change";
pub const PASSWORD_RESET_SALT: &str = "accounts.password-reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("signature expired")]
    Expired,
    #[error("bad signature")]
    BadSignature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningAlgorithm {
    #[default]
    HmacSha256,
    HmacSha512,
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "hmac-sha256" => Ok(Self::HmacSha256),
            "sha512" | "hmac-sha512" => Ok(Self::HmacSha512),
            other => Err(format!("Unsupported signing algorithm: {}", other)),
        }
    }
}

/// Secret + algorithme, construit une fois depuis la config
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
    algorithm: SigningAlgorithm,
}

impl SigningKey {
    pub fn new(secret: impl Into<Vec<u8>>, algorithm: SigningAlgorithm) -> Self {
        Self {
            secret: secret.into(),
            algorithm,
        }
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

// Ne jamais afficher le secret dans les logs
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Émet et vérifie des tokens signés pour un usage donné (salt)
#[derive(Clone)]
pub struct TokenCodec {
    key: Vec<u8>,
    algorithm: SigningAlgorithm,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Dérive une clé propre au salt: HMAC(secret, namespace + salt)
    pub fn new(signing: &SigningKey, salt: &str) -> Self {
        let derived = compute_mac(
            signing.algorithm,
            &signing.secret,
            format!("{}{}", KEY_NAMESPACE, salt).as_bytes(),
        );

        Self {
            key: derived,
            algorithm: signing.algorithm,
        }
    }

    /// Génère un token pour `payload`, horodaté maintenant
    pub fn issue(&self, payload: &str) -> String {
        self.issue_at(payload, Utc::now())
    }

    pub fn issue_at(&self, payload: &str, issued_at: DateTime<Utc>) -> String {
        // Les dates avant 1970 n'ont pas de sens ici
        let timestamp = issued_at.timestamp().max(0) as u64;

        let value = format!(
            "{}{}{:x}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            SEPARATOR,
            timestamp
        );
        let signature = compute_mac(self.algorithm, &self.key, value.as_bytes());

        format!("{}{}{}", value, SEPARATOR, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Vérifie un token et retourne son payload
    ///
    /// Retourne `BadSignature` si le token est malformé ou modifié,
    /// `Expired` si son âge atteint `max_age`.
    pub fn verify(&self, token: &str, max_age: Duration) -> Result<String, TokenError> {
        self.verify_at(token, max_age, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        // 1. Découper en 3 parties exactement
        let mut parts = token.split(SEPARATOR);
        let (Some(payload), Some(timestamp), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::BadSignature);
        };

        // 2. Vérifier la signature sur "<payload>:<timestamp>"
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::BadSignature)?;
        let signed_len = payload.len() + SEPARATOR.len_utf8() + timestamp.len();
        let signed_value = &token[..signed_len];

        if !verify_mac(self.algorithm, &self.key, signed_value.as_bytes(), &signature) {
            return Err(TokenError::BadSignature);
        }

        // 3. Vérifier l'âge
        let issued_at = u64::from_str_radix(timestamp, 16)
            .ok()
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(TokenError::BadSignature)?;

        if now.signed_duration_since(issued_at) >= max_age {
            return Err(TokenError::Expired);
        }

        // 4. Décoder le payload
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::BadSignature)?;

        String::from_utf8(bytes).map_err(|_| TokenError::BadSignature)
    }
}

fn compute_mac(algorithm: SigningAlgorithm, key: &[u8], message: &[u8]) -> Vec<u8> {
    match algorithm {
        SigningAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        SigningAlgorithm::HmacSha512 => {
            let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

// Comparaison en temps constant (verify_slice)
fn verify_mac(algorithm: SigningAlgorithm, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    match algorithm {
        SigningAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.verify_slice(signature).is_ok()
        }
        SigningAlgorithm::HmacSha512 => {
            let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.verify_slice(signature).is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(salt: &str) -> TokenCodec {
        TokenCodec::new(
            &SigningKey::new("test-secret", SigningAlgorithm::HmacSha256),
            salt,
        )
    }

    #[test]
    fn test_issue_and_verify_token() {
        let codec = codec(SIGNUP_SALT);
        let token = codec.issue("3f2a9c0e5b7d4e1f8a6b2c9d0e1f2a3b");

        let payload = codec.verify(&token, Duration::hours(6)).unwrap();
        assert_eq!(payload, "3f2a9c0e5b7d4e1f8a6b2c9d0e1f2a3b");
    }

    #[test]
    fn test_token_is_url_safe() {
        let codec = codec(EMAIL_CHANGE_SALT);
        let token = codec.issue("{\"email\":\"new@x.com\"}?&/+=");

        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
        );
    }

    #[test]
    fn test_unicode_payload() {
        let codec = codec(EMAIL_CHANGE_SALT);
        let token = codec.issue("élodie@exemple.fr");

        assert_eq!(
            codec.verify(&token, Duration::hours(1)).unwrap(),
            "élodie@exemple.fr"
        );
    }

    #[test]
    fn test_expired_token() {
        let codec = codec(SIGNUP_SALT);
        let issued_at = Utc::now() - Duration::hours(2);
        let token = codec.issue_at("payload", issued_at);

        let max_age = Duration::hours(1);
        assert_eq!(
            codec.verify_at(&token, max_age, issued_at + max_age),
            Err(TokenError::Expired)
        );
        assert_eq!(codec.verify(&token, max_age), Err(TokenError::Expired));
        assert_eq!(
            codec.verify_at(&token, max_age, issued_at + max_age - Duration::seconds(1)),
            Ok("payload".to_string())
        );
    }

    #[test]
    fn test_any_flipped_character_is_rejected() {
        let codec = codec(SIGNUP_SALT);
        let token = codec.issue("a@x.com");

        for (index, c) in token.char_indices() {
            let replacement = if c == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..index + c.len_utf8(), &replacement.to_string());

            assert_eq!(
                codec.verify(&tampered, Duration::hours(1)),
                Err(TokenError::BadSignature),
                "flipping index {} was accepted",
                index
            );
        }
    }

    #[test]
    fn test_tampering_is_detected_before_expiry() {
        let codec = codec(SIGNUP_SALT);
        let old = Utc::now() - Duration::days(30);
        let token = codec.issue_at("payload", old);
        let tampered = format!("{}x", token);

        assert_eq!(
            codec.verify(&tampered, Duration::hours(1)),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec(SIGNUP_SALT);
        for token in ["", "abc", "a:b", "a:b:c:d", "::", "not a token at all"] {
            assert_eq!(
                codec.verify(token, Duration::hours(1)),
                Err(TokenError::BadSignature)
            );
        }
    }

    #[test]
    fn test_salt_separates_purposes() {
        let signup = codec(SIGNUP_SALT);
        let email_change = codec(EMAIL_CHANGE_SALT);
        let token = signup.issue("new@x.com");

        assert_eq!(
            email_change.verify(&token, Duration::hours(24)),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_secret_and_algorithm_are_part_of_signature() {
        let token = codec(SIGNUP_SALT).issue("payload");

        let other_secret = TokenCodec::new(
            &SigningKey::new("other-secret", SigningAlgorithm::HmacSha256),
            SIGNUP_SALT,
        );
        let other_algorithm = TokenCodec::new(
            &SigningKey::new("test-secret", SigningAlgorithm::HmacSha512),
            SIGNUP_SALT,
        );

        assert_eq!(
            other_secret.verify(&token, Duration::hours(1)),
            Err(TokenError::BadSignature)
        );
        assert_eq!(
            other_algorithm.verify(&token, Duration::hours(1)),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_sha512_round_trip() {
        let codec = TokenCodec::new(
            &SigningKey::new("test-secret", SigningAlgorithm::HmacSha512),
            PASSWORD_RESET_SALT,
        );
        let token = codec.issue("payload");

        assert_eq!(codec.verify(&token, Duration::days(3)).unwrap(), "payload");
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("sha256".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::HmacSha256));
        assert_eq!("HMAC-SHA512".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::HmacSha512));
        assert!("md5".parse::<SigningAlgorithm>().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = SigningKey::new("super-secret", SigningAlgorithm::HmacSha256);
        assert!(!format!("{:?}", key).contains("super-secret"));
    }
}
