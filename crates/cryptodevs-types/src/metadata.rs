//! OpenSea-compatible token metadata served by `GET /api/{token_id}`.

use serde::{Deserialize, Serialize};

/// Prefix of every token name: `Crypto Dev #{token_id}`.
pub const TOKEN_NAME_PREFIX: &str = "Crypto Dev #";

pub const COLLECTION_DESCRIPTION: &str = "Crypto Dev is a collection of developers in crypto";

/// Metadata document for a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
}

impl TokenMetadata {
    /// Build metadata for `token_id`. The id is echoed verbatim, never validated.
    pub fn for_token(token_id: &str, image_base_url: &str) -> Self {
        Self {
            name: format!("{TOKEN_NAME_PREFIX}{token_id}"),
            description: COLLECTION_DESCRIPTION.to_string(),
            image: format!("{image_base_url}{token_id}.svg"),
        }
    }
}
