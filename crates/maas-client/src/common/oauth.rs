//! OAuth 1.0 PLAINTEXT signing for MAAS API keys
//!
//! A MAAS API key has the form `consumer_key:token_key:token_secret`. MAAS
//! accepts PLAINTEXT signatures, so every request carries the secret in the
//! header together with a fresh nonce and timestamp.

use crate::error::MaasError;

/// Parsed MAAS API key
#[derive(Clone)]
pub struct ApiKey {
    consumer_key: String,
    token_key: String,
    token_secret: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("consumer_key", &self.consumer_key)
            .field("token_key", &self.token_key)
            .finish_non_exhaustive()
    }
}

impl ApiKey {
    /// Parse an API key as printed by `maas apikey`
    pub fn parse(raw: &str) -> Result<Self, MaasError> {
        let parts: Vec<&str> = raw.trim().split(':').collect();
        match parts.as_slice() {
            [consumer, token, secret] if !consumer.is_empty() && !token.is_empty() && !secret.is_empty() => {
                Ok(Self {
                    consumer_key: (*consumer).to_string(),
                    token_key: (*token).to_string(),
                    token_secret: (*secret).to_string(),
                })
            }
            _ => Err(MaasError::Authentication(
                "API key must have the form consumer_key:token_key:token_secret".to_string(),
            )),
        }
    }

    /// Build the `Authorization` header value for one request
    pub fn authorization_header(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.header_with(&nonce, timestamp)
    }

    fn header_with(&self, nonce: &str, timestamp: i64) -> String {
        format!(
            "OAuth realm=\"\", oauth_version=\"1.0\", oauth_signature_method=\"PLAINTEXT\", \
             oauth_consumer_key=\"{}\", oauth_token=\"{}\", oauth_signature=\"&{}\", \
             oauth_nonce=\"{}\", oauth_timestamp=\"{}\"",
            urlencoding::encode(&self.consumer_key),
            urlencoding::encode(&self.token_key),
            urlencoding::encode(&self.token_secret),
            nonce,
            timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_key() {
        let key = ApiKey::parse("abc:def:ghi\n").unwrap();
        let header = key.header_with("n0nce", 1_700_000_000);
        assert!(header.starts_with("OAuth realm=\"\""));
        assert!(header.contains("oauth_consumer_key=\"abc\""));
        assert!(header.contains("oauth_token=\"def\""));
        assert!(header.contains("oauth_signature=\"&ghi\""));
        assert!(header.contains("oauth_nonce=\"n0nce\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
    }

    #[test]
    fn test_parse_rejects_malformed_key() {
        assert!(matches!(ApiKey::parse("abc:def"), Err(MaasError::Authentication(_))));
        assert!(matches!(ApiKey::parse("abc::ghi"), Err(MaasError::Authentication(_))));
        assert!(matches!(ApiKey::parse("a:b:c:d"), Err(MaasError::Authentication(_))));
    }

    #[test]
    fn test_nonce_changes_per_request() {
        let key = ApiKey::parse("abc:def:ghi").unwrap();
        assert_ne!(key.authorization_header(), key.authorization_header());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = ApiKey::parse("abc:def:topsecret").unwrap();
        assert!(!format!("{:?}", key).contains("topsecret"));
    }
}
