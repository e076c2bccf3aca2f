use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::{Digest, Sha256};
use rand::{Rng, distributions::Alphanumeric};
use base64::{Engine, engine::general_purpose::{STANDARD, STANDARD_NO_PAD}};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "pbkdf2_sha256";
// Réduit en test: PBKDF2 à 600000 itérations est trop lent en debug
const ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 22;

/// Hash un mot de passe au format `pbkdf2_sha256$iterations$salt$hash`
/// Le salt est alphanumérique, le hash en base64 standard
pub fn hash_password(password: &str) -> Result<String, String> {
    // Générer un salt aléatoire alphanumérique
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();

    let key = derive(password, &salt, ITERATIONS, KEY_LENGTH)?;

    Ok(format!("{}${}${}${}", ALGORITHM, ITERATIONS, salt, STANDARD.encode(key)))
}

/// Vérifie un mot de passe contre un hash stocké
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    // Parser le format: algorithm$iterations$salt$hash
    let parts: Vec<&str> = stored_hash.split('$').collect();
    if parts.len() != 4 {
        return Err("Invalid hash format".to_string());
    }

    if parts[0] != ALGORITHM {
        return Err(format!("Unsupported hash algorithm: {}", parts[0]));
    }

    let iterations = parts[1]
        .parse::<u32>()
        .map_err(|_| "Invalid iterations".to_string())?;
    let salt = parts[2];

    // Accepte le hash avec ou sans padding
    let expected = STANDARD
        .decode(parts[3])
        .or_else(|_| STANDARD_NO_PAD.decode(parts[3]))
        .map_err(|e| format!("Invalid hash encoding: {}", e))?;

    if expected.is_empty() {
        return Err("Empty hash".to_string());
    }

    let computed = derive(password, salt, iterations, expected.len())?;

    // Comparaison en temps constant
    Ok(computed.ct_eq(&expected).into())
}

/// Empreinte courte d'un état de compte (hash du mot de passe + dernière connexion)
/// Change dès que le mot de passe change ou que l'utilisateur se reconnecte
pub fn fingerprint(password_hash: &str, last_login: Option<i64>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password_hash.as_bytes());
    hasher.update(b"|");
    if let Some(ts) = last_login {
        hasher.update(ts.to_string().as_bytes());
    }
    hex::encode(&hasher.finalize()[..16])
}

fn derive(password: &str, salt: &str, iterations: u32, length: usize) -> Result<Vec<u8>, String> {
    let mut key = vec![0u8; length];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key)
        .map_err(|e| format!("PBKDF2 failed: {}", e))?;
    Ok(key)
}
