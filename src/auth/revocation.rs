//! Refresh Token台账
//!
//! 键为 `refresh_token:{token}`，值为所属用户ID，过期时间等于refresh token的有效期。
//! 只有台账中存在且归属一致的refresh token才能换取新的access token。

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::infrastructure::store::{KeyBuilder, KeyValueStore, StoreError};
use crate::shared::constants::keys;
use crate::shared::types::UserId;

#[derive(Clone)]
pub struct RevocationLedger {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
}

impl RevocationLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    fn key(&self, token: &str) -> String {
        self.keys.build(keys::REFRESH_TOKEN, token)
    }

    /// 登记refresh token为有效，覆盖同值的旧记录
    pub async fn record(&self, token: &str, subject: &str, ttl: Duration) -> Result<(), StoreError> {
        self.store.set_ex(&self.key(token), subject, ttl).await?;
        debug!("refresh token已登记: user_id={}, ttl={:?}", subject, ttl);
        Ok(())
    }

    /// 查询refresh token的归属用户
    pub async fn lookup(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        self.store.get(&self.key(token)).await
    }

    /// 撤销refresh token；不存在时同样视为成功
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let removed = self.store.delete(&self.key(token)).await?;
        debug!("refresh token撤销: removed={}", removed);
        Ok(())
    }
}
