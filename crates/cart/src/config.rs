//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PUBLIC_TOKEN` - Storefront API public access token
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token
//!   (server-side only; replaces the public token when set)
//! - `SHOPIFY_COUNTRY_CODE` - Country the cart's buyer identity should carry
//! - `SHOPIFY_CUSTOMER_ACCESS_TOKEN` - Customer the cart should belong to
//! - `CART_FRAGMENT_PATH` - File holding a custom `fragment CartFragment on Cart`
//! - `CART_ID_STORE_PATH` - Where the active cart ID is kept (default: .cart-id.json)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;

use pineapple_cart_core::CountryCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2026-01";
const DEFAULT_CART_ID_STORE_PATH: &str = ".cart-id.json";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart application configuration.
///
/// Implements `Debug` manually to redact the customer access token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Shopify Storefront API configuration
    pub shopify: ShopifyStorefrontConfig,
    /// Country new carts should be created in
    pub country_code: Option<CountryCode>,
    /// Customer new carts should be associated with
    pub customer_access_token: Option<SecretString>,
    /// Custom cart fragment, already read from `CART_FRAGMENT_PATH`
    pub cart_fragment: Option<String>,
    /// File backing the persisted cart ID
    pub cart_id_store_path: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("shopify", &self.shopify)
            .field("country_code", &self.country_code)
            .field(
                "customer_access_token",
                &self.customer_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cart_fragment", &self.cart_fragment.is_some())
            .field("cart_id_store_path", &self.cart_id_store_path)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API public access token (safe to expose in browser)
    pub storefront_public_token: String,
    /// Storefront API private access token (server-side only)
    pub storefront_private_token: Option<SecretString>,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_public_token", &self.storefront_public_token)
            .field(
                "storefront_private_token",
                &self.storefront_private_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_source(source: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(source);

        let shopify = ShopifyStorefrontConfig::from_source(&env)?;

        let country_code = env
            .optional("SHOPIFY_COUNTRY_CODE")
            .map(|value| {
                CountryCode::parse(&value).map_err(|e| {
                    ConfigError::InvalidEnvVar("SHOPIFY_COUNTRY_CODE".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let customer_access_token = env.optional_secret("SHOPIFY_CUSTOMER_ACCESS_TOKEN")?;

        let cart_fragment = env
            .optional("CART_FRAGMENT_PATH")
            .map(|path| {
                std::fs::read_to_string(&path).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "CART_FRAGMENT_PATH".to_string(),
                        format!("{path}: {e}"),
                    )
                })
            })
            .transpose()?;

        let cart_id_store_path =
            PathBuf::from(env.or_default("CART_ID_STORE_PATH", DEFAULT_CART_ID_STORE_PATH));
        let sentry_dsn = env.optional("SENTRY_DSN");

        Ok(Self {
            shopify,
            country_code,
            customer_access_token,
            cart_fragment,
            cart_id_store_path,
            sentry_dsn,
        })
    }
}

impl ShopifyStorefrontConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let config = Self {
            store: env.required("SHOPIFY_STORE")?,
            api_version: env.or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            storefront_public_token: env.required("SHOPIFY_STOREFRONT_PUBLIC_TOKEN")?,
            storefront_private_token: env.optional_secret("SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?,
        };
        config.graphql_endpoint()?;
        Ok(config)
    }

    /// The Storefront API GraphQL endpoint for this store and version.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `store` is not a bare domain.
    pub fn graphql_endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEnvVar("SHOPIFY_STORE".to_string(), reason);

        let endpoint = Url::parse(&format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        ))
        .map_err(|e| invalid(e.to_string()))?;

        if endpoint.host_str() != Some(self.store.as_str()) {
            return Err(invalid(
                "expected a bare domain such as your-store.myshopify.com".to_string(),
            ));
        }

        Ok(endpoint)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup shared by the loaders.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Load and validate an optional secret.
    fn optional_secret(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
        self.optional(key)
            .map(|value| {
                validate_secret_strength(&value, key)?;
                Ok(SecretString::from(value))
            })
            .transpose()
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued by Shopify."
            ),
        ));
    }

    Ok(())
}
