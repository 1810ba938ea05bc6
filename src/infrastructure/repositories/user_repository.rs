//! 用户身份存储操作
//!
//! 记录存放在 `user:{id}`，并维护 `username:{name}` 与 `openid:{openid}`
//! 两个二级索引。主记录与索引按顺序分开写入，中途失败不回滚。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::business::domain::User;
use crate::infrastructure::store::{KeyBuilder, KeyValueStore};
use crate::internal_error;
use crate::shared::constants::keys;
use crate::shared::AppResult;

/// 用户存储服务
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
}

impl UserRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    fn user_key(&self, id: &str) -> String {
        self.keys.build(keys::USER, id)
    }

    fn username_key(&self, username: &str) -> String {
        self.keys.build(keys::USERNAME_INDEX, username)
    }

    fn open_id_key(&self, open_id: &str) -> String {
        self.keys.build(keys::OPENID_INDEX, open_id)
    }

    async fn write_record(&self, user: &User) -> AppResult<()> {
        let json = serde_json::to_string(user).map_err(crate::infrastructure::StoreError::from)?;
        self.store.set(&self.user_key(&user.id), &json).await?;
        Ok(())
    }

    /// 创建用户并写入用户名索引
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create(&self, user: &mut User) -> AppResult<()> {
        if user.id.is_empty() {
            return Err(internal_error!("user ID cannot be empty"));
        }

        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;

        self.write_record(user).await?;
        self.store
            .set(&self.username_key(&user.username), &user.id)
            .await?;

        info!("👤 用户创建成功: {}", user.id);
        Ok(())
    }

    /// 按主ID查询
    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let Some(json) = self.store.get(&self.user_key(id)).await? else {
            return Ok(None);
        };
        let user = serde_json::from_str(&json).map_err(crate::infrastructure::StoreError::from)?;
        Ok(Some(user))
    }

    /// 按用户名查询
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        match self.store.get(&self.username_key(username)).await? {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// 按微信OpenID查询
    pub async fn get_by_open_id(&self, open_id: &str) -> AppResult<Option<User>> {
        match self.store.get(&self.open_id_key(open_id)).await? {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// 查找或创建微信用户
    ///
    /// 同一个OpenID总是解析到同一个主ID（`wx_{openid}`）。
    #[instrument(skip(self, open_id))]
    pub async fn find_or_create_wechat_user(&self, open_id: &str) -> AppResult<User> {
        if open_id.is_empty() {
            return Err(internal_error!("OpenID cannot be empty"));
        }

        let index_key = self.open_id_key(open_id);
        if let Some(id) = self.store.get(&index_key).await? {
            if let Some(user) = self.get_by_id(&id).await? {
                return Ok(user);
            }
            // 索引存在但主记录缺失（上次创建中途失败），按相同ID重建
            warn!("⚠️ OpenID索引指向不存在的用户，重建记录: {}", id);
        }

        let user = User::with_open_id(open_id);
        self.write_record(&user).await?;
        self.store
            .set(&self.username_key(&user.username), &user.id)
            .await?;
        self.store.set(&index_key, &user.id).await?;

        info!("👤 微信用户创建成功: {}", user.id);
        Ok(user)
    }

    /// 更新已存在的用户
    pub async fn update(&self, user: &mut User) -> AppResult<()> {
        if self.get_by_id(&user.id).await?.is_none() {
            return Err(internal_error!("user not found: {}", user.id));
        }
        user.updated_at = Utc::now();
        self.write_record(user).await
    }

    /// 删除用户及其索引
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| internal_error!("user not found: {}", id))?;

        self.store.delete(&self.user_key(id)).await?;
        self.store.delete(&self.username_key(&user.username)).await?;
        if let Some(open_id) = &user.open_id {
            self.store.delete(&self.open_id_key(open_id)).await?;
        }

        info!("🗑️ 用户已删除: {}", id);
        Ok(())
    }
}
