//! Provider session contract.
//!
//! A session is a bound set of credentials/clients for exactly one
//! account, subscription, or project. The core never touches SDK clients;
//! concrete extractors recover their own handle through [`as_any`]
//! downcasting.
//!
//! [`as_any`]: ProviderSession::as_any

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::ExtractResult;

/// Bound credentials for one account/subscription/project.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Account, subscription, or project identifier.
    fn account_id(&self) -> &str;

    /// Regions this session can operate in.
    ///
    /// Region-scoped extractors fan out over these when the caller does
    /// not request explicit regions. Global providers may return an empty
    /// list.
    async fn regions(&self) -> ExtractResult<Vec<String>>;

    /// Escape hatch for concrete extractors to recover their SDK handle.
    fn as_any(&self) -> &dyn Any;
}

/// One session plus its registration-time binding information, as handed
/// to [`ExtractorRegistry::register_provider`].
///
/// [`ExtractorRegistry::register_provider`]: crate::registry::ExtractorRegistry::register_provider
#[derive(Clone)]
pub struct SessionEntry {
    /// The live session.
    pub session: Arc<dyn ProviderSession>,

    /// Account the session is bound to.
    pub account_id: String,

    /// Usable regions captured at registration time.
    pub regions: Vec<String>,
}

impl SessionEntry {
    /// Create an entry with an explicit region list.
    pub fn new(
        session: Arc<dyn ProviderSession>,
        account_id: impl Into<String>,
        regions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            session,
            account_id: account_id.into(),
            regions: regions.into_iter().map(|r| r.into()).collect(),
        }
    }

    /// Build an entry by asking the session for its account and regions.
    pub async fn from_session(session: Arc<dyn ProviderSession>) -> ExtractResult<Self> {
        let account_id = session.account_id().to_string();
        let regions = session.regions().await?;
        Ok(Self {
            session,
            account_id,
            regions,
        })
    }
}

impl fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEntry")
            .field("account_id", &self.account_id)
            .field("regions", &self.regions)
            .finish()
    }
}
