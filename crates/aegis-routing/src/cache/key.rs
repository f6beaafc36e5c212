use aegis_core::PromptRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Hex digits of the fingerprint used for sampling decisions.
const SAMPLE_PREFIX_HEX: usize = 16;

/// Fingerprint of the semantically relevant parts of a request.
///
/// Prompts that differ only in surrounding or repeated whitespace share a key,
/// as do temperatures that round to the same bucket. Letter case is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Computes the key for `request`, bucketing temperature into steps of `bucket_width`.
    pub fn fingerprint(request: &PromptRequest, bucket_width: f32) -> Self {
        let mut hasher = Sha256::new();

        let prompt = normalize_whitespace(&request.prompt);
        write_field(&mut hasher, prompt.as_bytes());

        match request.context_text() {
            Some(context) => {
                hasher.update([1]);
                write_field(&mut hasher, normalize_whitespace(context).as_bytes());
            }
            None => hasher.update([0]),
        }

        hasher.update(temperature_bucket(request.temperature, bucket_width).to_le_bytes());
        hasher.update(request.max_tokens.to_le_bytes());

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position of this key in `[0, 1]`, stable across processes.
    pub fn sample_fraction(&self) -> f64 {
        let prefix = self.0.get(..SAMPLE_PREFIX_HEX).unwrap_or(&self.0);
        u64::from_str_radix(prefix, 16).map_or(0.0, |value| value as f64 / u64::MAX as f64)
    }
}

impl Display for CacheKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(&self.0)
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Collapses whitespace runs to single spaces and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index of the bucket `temperature` rounds to.
pub fn temperature_bucket(temperature: f32, bucket_width: f32) -> i64 {
    (temperature / bucket_width).round() as i64
}
