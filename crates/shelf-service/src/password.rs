//! Password policy and argon2 hashing.

use argon2::{
  Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier as _, Version,
  password_hash::SaltString,
};
use rand_core::OsRng;
use serde::Deserialize;

use crate::{Error, Result};

// ─── Policy ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
  pub min_length: usize,
}

impl Default for PasswordPolicy {
  fn default() -> Self { Self { min_length: 8 } }
}

impl PasswordPolicy {
  /// Check an already-trimmed password.
  pub fn check(&self, password: &str) -> Result<()> {
    if password.chars().count() < self.min_length {
      return Err(Error::WeakPassword(format!(
        "password must be at least {} characters",
        self.min_length
      )));
    }
    if !password.chars().any(char::is_uppercase) {
      return Err(Error::WeakPassword("password must contain an uppercase letter".into()));
    }
    if !password.chars().any(char::is_lowercase) {
      return Err(Error::WeakPassword("password must contain a lowercase letter".into()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
      return Err(Error::WeakPassword("password must contain a digit".into()));
    }
    Ok(())
  }
}

// ─── Hashing ─────────────────────────────────────────────────────────────────

/// argon2id cost parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HashCost {
  pub memory_kib:  u32,
  pub iterations:  u32,
  pub parallelism: u32,
}

impl Default for HashCost {
  fn default() -> Self {
    Self {
      memory_kib:  Params::DEFAULT_M_COST,
      iterations:  Params::DEFAULT_T_COST,
      parallelism: Params::DEFAULT_P_COST,
    }
  }
}

/// Produces and checks argon2id PHC strings.
#[derive(Clone)]
pub struct Hasher {
  argon2:     Argon2<'static>,
  /// Verified against when the account does not exist, so that a missing
  /// account costs as much as a wrong password.
  dummy_hash: String,
}

impl Hasher {
  pub fn new(cost: HashCost) -> Result<Self> {
    let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
      .map_err(|e| Error::PasswordHash(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let salt = SaltString::generate(&mut OsRng);
    let dummy_hash = argon2
      .hash_password(b"not-a-real-password", &salt)?
      .to_string();

    Ok(Self { argon2, dummy_hash })
  }

  pub fn hash(&self, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(self.argon2.hash_password(password.as_bytes(), &salt)?.to_string())
  }

  /// `Ok(false)` on mismatch; `Err` only when `phc` is not a usable hash.
  pub fn verify(&self, password: &str, phc: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc)?;
    match self.argon2.verify_password(password.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(argon2::password_hash::Error::Password) => Ok(false),
      Err(e) => Err(e.into()),
    }
  }

  /// Burn one verification's worth of work and discard the result.
  pub fn verify_dummy(&self, password: &str) {
    let _ = self.verify(password, &self.dummy_hash);
  }
}
