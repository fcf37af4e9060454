use crate::codegen;
use crate::error::CoreError;
use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// A long URL and the short code it is reachable under.
///
/// Only `short_code` and `original_url` are persisted, both in the durable
/// store and (as JSON) in the cache. The public `shortened_url` is derived
/// from the configured host every time the record is handed to a caller, so
/// a host change applies to every existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenedUrl {
    #[serde(rename = "shortCode")]
    pub short_code: ShortCode,
    #[serde(rename = "originalURL")]
    pub original_url: String,
    #[serde(skip)]
    pub shortened_url: Option<String>,
}

impl ShortenedUrl {
    pub fn new(short_code: ShortCode, original_url: impl Into<String>) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            shortened_url: None,
        }
    }

    /// Builds a record for `original_url` whose code is generated with `salt`.
    pub fn generate(original_url: impl Into<String>, salt: Option<&str>) -> Self {
        let original_url = original_url.into();
        let short_code = codegen::generate_code(&original_url, salt);
        Self::new(short_code, original_url)
    }

    /// Derives and attaches the public short URL, `<public_host>/<short_code>`.
    pub fn attach_public_url(&mut self, public_host: &str) -> Result<(), CoreError> {
        if public_host.trim().is_empty() {
            return Err(CoreError::MissingPublicHost);
        }
        self.shortened_url = Some(self.short_code.to_url(public_host));
        Ok(())
    }
}
