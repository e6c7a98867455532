//! Resolution of the current profile published for a profile token.

mod onchain;

pub use self::onchain::OnchainProfileResolver;
use crate::models::{Profile, TokenId};
use anyhow::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileResolving: Send + Sync {
    /// Retrieves the current profile of a token.
    ///
    /// Resolves to `None` if there is no profile for the token. Errors are
    /// reserved for failures to reach the underlying data sources.
    async fn resolve_profile(&self, token_id: &TokenId) -> Result<Option<Profile>>;
}
