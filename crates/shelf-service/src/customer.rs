//! Customer identity: signup, login, and token lookup.

use std::{fmt, sync::Arc};

use serde::Deserialize;
use shelf_core::{
  clock::Clock,
  customer::{Address, Customer},
  store::{CustomerStore, TokenStore},
  subject::SubjectKind,
};
use uuid::Uuid;

use crate::{
  Error, IdentityConfig, Result,
  password::{Hasher, PasswordPolicy},
  token::{TokenIssuer, TokenPair, TokenTtl, generate_short_id},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
  pub first_name:  Option<String>,
  pub last_name:   Option<String>,
  pub country:     Option<String>,
  pub street_name: Option<String>,
  pub postal_code: Option<String>,
  pub city:        Option<String>,
  pub email:       Option<String>,
  pub department:  Option<String>,
}

impl AddressInput {
  fn into_address(self, id: String) -> Address {
    Address {
      id,
      first_name: self.first_name,
      last_name: self.last_name,
      country: self.country,
      street_name: self.street_name,
      postal_code: self.postal_code,
      city: self.city,
      email: self.email,
      department: self.department,
    }
  }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
  #[serde(default)]
  pub email:                    String,
  #[serde(default)]
  pub password:                 String,
  pub first_name:               Option<String>,
  pub last_name:                Option<String>,
  pub date_of_birth:            Option<String>,
  #[serde(default)]
  pub addresses:                Vec<AddressInput>,
  /// Position in `addresses`; out-of-range values fall back to the first.
  pub default_shipping_address: Option<i64>,
  pub default_billing_address:  Option<i64>,
}

impl fmt::Debug for SignupInput {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SignupInput")
      .field("email", &self.email)
      .field("password", &"[redacted]")
      .field("first_name", &self.first_name)
      .field("last_name", &self.last_name)
      .field("date_of_birth", &self.date_of_birth)
      .field("addresses", &self.addresses)
      .field("default_shipping_address", &self.default_shipping_address)
      .field("default_billing_address", &self.default_billing_address)
      .finish()
  }
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
  pub customer: Customer,
  pub tokens:   TokenPair,
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn pick_default(addresses: &[Address], index: Option<i64>) -> Option<String> {
  index
    .and_then(|i| usize::try_from(i).ok())
    .and_then(|i| addresses.get(i))
    .or_else(|| addresses.first())
    .map(|a| a.id.clone())
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct CustomerService<S> {
  store:  Arc<S>,
  clock:  Arc<dyn Clock>,
  tokens: TokenIssuer<S>,
  hasher: Hasher,
  policy: PasswordPolicy,
  ttl:    TokenTtl,
}

impl<S: CustomerStore + TokenStore> CustomerService<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: &IdentityConfig) -> Result<Self> {
    Ok(Self {
      tokens: TokenIssuer::new(store.clone(), clock.clone(), SubjectKind::Customer),
      store,
      clock,
      hasher: Hasher::new(config.hash_cost)?,
      policy: config.password.clone(),
      ttl: config.customer_tokens,
    })
  }

  pub fn access_ttl_secs(&self) -> i64 { self.ttl.access_secs }

  /// Register a customer. Surrounding whitespace in the password is dropped
  /// before the policy check and before hashing.
  pub async fn signup(&self, project_id: Uuid, input: SignupInput) -> Result<Customer> {
    let email = normalize_email(&input.email);
    if email.is_empty() {
      return Err(Error::EmailRequired);
    }

    let password = input.password.trim();
    self.policy.check(password)?;
    let password_hash = self.hasher.hash(password)?;

    let addresses = input
      .addresses
      .into_iter()
      .map(|a| Ok(a.into_address(generate_short_id()?)))
      .collect::<Result<Vec<_>>>()?;
    let default_shipping = pick_default(&addresses, input.default_shipping_address);
    let default_billing = pick_default(&addresses, input.default_billing_address);

    let customer = Customer {
      id: Uuid::new_v4(),
      project_id,
      email,
      password_hash,
      first_name: input.first_name,
      last_name: input.last_name,
      date_of_birth: input.date_of_birth,
      addresses,
      shipping_address_ids: default_shipping.iter().cloned().collect(),
      billing_address_ids: default_billing.iter().cloned().collect(),
      default_shipping_address_id: default_shipping,
      default_billing_address_id: default_billing,
      created_at: self.clock.now(),
    };

    let customer = self.store.insert_customer(customer).await?;
    tracing::info!(%project_id, customer_id = %customer.id, "customer signed up");
    Ok(customer)
  }

  /// Check credentials and issue an access/refresh pair.
  ///
  /// An unknown email and a wrong password are reported identically.
  pub async fn login(&self, project_id: Uuid, email: &str, password: &str) -> Result<LoginOutcome> {
    let password = password.trim();
    let found = self
      .store
      .get_customer_by_email(project_id, normalize_email(email))
      .await?;

    let Some(customer) = found else {
      self.hasher.verify_dummy(password);
      return Err(Error::InvalidCredentials);
    };

    if !self.hasher.verify(password, &customer.password_hash)? {
      return Err(Error::InvalidCredentials);
    }

    let tokens = self.tokens.issue_pair(project_id, customer.id, self.ttl).await?;
    tracing::debug!(%project_id, customer_id = %customer.id, "customer logged in");
    Ok(LoginOutcome { customer, tokens })
  }

  /// The customer behind an access token.
  pub async fn lookup_by_token(&self, project_id: Uuid, token: &str) -> Result<Customer> {
    let Some(customer_id) = self.tokens.validate(project_id, token).await? else {
      return Err(Error::InvalidToken);
    };
    self
      .store
      .get_customer(project_id, customer_id)
      .await?
      .ok_or(Error::InvalidToken)
  }
}
