//! JWT service for token generation, validation, and renewal decisions
//!
//! Tokens are signed with RS256 when a PEM key pair is configured and with
//! HS256 otherwise. Every token carries a random `jti`, so two tokens minted
//! for the same user in the same second still differ.

use anyhow::Result;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{Error as JwtError, ErrorKind},
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::User;

/// Signing material
#[derive(Debug, Clone)]
pub enum JwtKeys {
    /// RS256 key pair in PEM format
    Rsa {
        private_key: String,
        public_key: String,
    },
    /// HS256 shared secret
    Hmac { secret: String },
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub keys: JwtKeys,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
    /// Remaining refresh token lifetime, in seconds, under which a reissue
    /// rotates the refresh token as well (default: 3 days)
    pub refresh_renewal_threshold: u64,
}

const DEFAULT_ACCESS_TOKEN_EXPIRY: u64 = 900;
const DEFAULT_REFRESH_TOKEN_EXPIRY: u64 = 604_800;
const DEFAULT_REFRESH_RENEWAL_THRESHOLD: u64 = 259_200;
const MIN_SECRET_LEN: usize = 32;

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY`: RS256 key pair (PEM or path to a PEM file)
    /// - `JWT_SECRET`: HS256 secret, used when no key pair is set (at least 32 bytes)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    /// - `JWT_REFRESH_RENEWAL_THRESHOLD`: Rotation threshold in seconds (default: 259200)
    pub fn from_env() -> Result<Self> {
        let keys = match (
            std::env::var("JWT_PRIVATE_KEY"),
            std::env::var("JWT_PUBLIC_KEY"),
        ) {
            (Ok(private_key), Ok(public_key)) => JwtKeys::Rsa {
                private_key: read_key_material(&private_key, "private")?,
                public_key: read_key_material(&public_key, "public")?,
            },
            (Err(_), Err(_)) => {
                let secret = std::env::var("JWT_SECRET").map_err(|_| {
                    anyhow::anyhow!("Set JWT_SECRET or both JWT_PRIVATE_KEY and JWT_PUBLIC_KEY")
                })?;
                if secret.len() < MIN_SECRET_LEN {
                    anyhow::bail!("JWT_SECRET must be at least {} bytes long", MIN_SECRET_LEN);
                }
                JwtKeys::Hmac { secret }
            }
            _ => anyhow::bail!("JWT_PRIVATE_KEY and JWT_PUBLIC_KEY must be set together"),
        };

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_EXPIRY.to_string())
            .parse()
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRY);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| DEFAULT_REFRESH_TOKEN_EXPIRY.to_string())
            .parse()
            .unwrap_or(DEFAULT_REFRESH_TOKEN_EXPIRY);

        let refresh_renewal_threshold = std::env::var("JWT_REFRESH_RENEWAL_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_REFRESH_RENEWAL_THRESHOLD.to_string())
            .parse()
            .unwrap_or(DEFAULT_REFRESH_RENEWAL_THRESHOLD);

        Ok(JwtConfig {
            keys,
            access_token_expiry,
            refresh_token_expiry,
            refresh_renewal_threshold,
        })
    }

    /// HS256 configuration with default lifetimes
    #[cfg(test)]
    pub fn with_secret(secret: &str) -> Self {
        JwtConfig {
            keys: JwtKeys::Hmac {
                secret: secret.to_string(),
            },
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
            refresh_renewal_threshold: DEFAULT_REFRESH_RENEWAL_THRESHOLD,
        }
    }
}

/// Inline PEM is returned as is; anything else is read as a path, first from
/// the working directory and then relative to the crate root.
fn read_key_material(value: &str, kind: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    let contents = std::fs::read_to_string(value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(value);
            std::fs::read_to_string(path)
        })
        .map_err(|e| anyhow::anyhow!("Failed to read {} key file: {}", kind, e))?;

    Ok(contents.trim().to_string())
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username, present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Unique token ID
    pub jti: Uuid,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

impl Claims {
    /// The user ID carried in `sub`
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// An access/refresh token pair as exchanged with clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtToken {
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let (algorithm, encoding_key, decoding_key) = match &config.keys {
            JwtKeys::Rsa {
                private_key,
                public_key,
            } => (
                Algorithm::RS256,
                EncodingKey::from_rsa_pem(private_key.as_bytes())?,
                DecodingKey::from_rsa_pem(public_key.as_bytes())?,
            ),
            JwtKeys::Hmac { secret } => (
                Algorithm::HS256,
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        info!("JWT service initialized with {:?}", algorithm);

        Ok(JwtService {
            encoding_key,
            decoding_key,
            header: Header::new(algorithm),
            validation,
            config,
        })
    }

    /// Generate a fresh access/refresh pair for a user
    pub fn generate_token_pair(&self, user: &User) -> Result<JwtToken, JwtError> {
        Ok(JwtToken {
            access_token: self.generate_access_token(user)?,
            refresh_token: self.generate_refresh_token(user)?,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String, JwtError> {
        let now = get_current_timestamp();

        let claims = Claims {
            sub: user.id.to_string(),
            username: Some(user.username.clone()),
            iat: now,
            exp: now + self.config.access_token_expiry,
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        };

        encode(&self.header, &claims, &self.encoding_key)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user: &User) -> Result<String, JwtError> {
        let now = get_current_timestamp();

        let claims = Claims {
            sub: user.id.to_string(),
            username: None,
            iat: now,
            exp: now + self.config.refresh_token_expiry,
            jti: Uuid::new_v4(),
            token_type: TokenType::Refresh,
        };

        encode(&self.header, &claims, &self.encoding_key)
    }

    /// Validate a token's signature and expiry and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token that must be an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_typed(token, TokenType::Access)
    }

    /// Validate a token that must be a refresh token
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_typed(token, TokenType::Refresh)
    }

    fn validate_typed(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(ErrorKind::InvalidToken.into());
        }
        Ok(claims)
    }

    /// Whether the refresh token described by `claims` is close enough to
    /// expiry that it should be replaced
    pub fn is_refresh_token_renewal_required(&self, claims: &Claims) -> bool {
        let remaining = claims.exp.saturating_sub(get_current_timestamp());
        remaining < self.config.refresh_renewal_threshold
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }
}
