use crate::domain::principal::Principal;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Inserts or replaces the principal under its id and hands it back.
    async fn save(&self, principal: Principal) -> Result<Principal>;
    /// Snapshot of every stored principal, in no particular order.
    async fn find_all(&self) -> Result<Vec<Principal>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>>;
    /// Saves only if no stored principal has the same email. The check and
    /// the insert are atomic; `None` means the email was taken.
    async fn save_if_email_absent(&self, principal: Principal) -> Result<Option<Principal>>;
}
