//! In-memory repositories for tests
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! copy of the state, which replaces the shared state only on commit.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{AuthTransaction, RefreshTokenRepository, TransactionManager, UserRepository};
use crate::models::{Audit, NewUser, RefreshToken, User};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    refresh_tokens: HashMap<i64, RefreshToken>,
    last_user_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user rows, soft-deleted included
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    pub async fn user(&self, id: i64) -> Option<User> {
        self.state.lock().await.users.get(&id).cloned()
    }

    pub async fn stored_refresh_token(&self, user_id: i64) -> Option<String> {
        self.state
            .lock()
            .await
            .refresh_tokens
            .get(&user_id)
            .map(|t| t.value.clone())
    }

    pub async fn soft_delete_refresh_token(&self, user_id: i64) {
        if let Some(token) = self.state.lock().await.refresh_tokens.get_mut(&user_id) {
            token.audit.deleted_at = Some(Utc::now());
        }
    }

    pub async fn soft_delete_user(&self, id: i64) {
        if let Some(user) = self.state.lock().await.users.get_mut(&id) {
            user.audit.deleted_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    async fn begin(&self) -> DatabaseResult<Box<dyn AuthTransaction>> {
        let committed = self.state.clone().lock_owned().await;
        let working = committed.clone();
        Ok(Box::new(MemoryTransaction { committed, working }))
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}

pub struct MemoryTransaction {
    committed: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl AuthTransaction for MemoryTransaction {
    fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    fn refresh_tokens(&mut self) -> &mut dyn RefreshTokenRepository {
        self
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        let MemoryTransaction {
            mut committed,
            working,
        } = *self;
        *committed = working;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryTransaction {
    async fn find_by_username(&mut self, username: &str) -> DatabaseResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username && u.audit.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_id(&mut self, id: i64) -> DatabaseResult<Option<User>> {
        Ok(self
            .working
            .users
            .get(&id)
            .filter(|u| u.audit.deleted_at.is_none())
            .cloned())
    }

    async fn exists_by_username(&mut self, username: &str) -> DatabaseResult<bool> {
        Ok(self.working.users.values().any(|u| u.username == username))
    }

    async fn create(&mut self, new_user: &NewUser) -> DatabaseResult<User> {
        if self.exists_by_username(&new_user.username).await? {
            return Err(DatabaseError::Conflict(format!(
                "username {} already taken",
                new_user.username
            )));
        }

        self.working.last_user_id += 1;
        let user = User {
            id: self.working.last_user_id,
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            last_login_at: None,
            audit: Audit::created(Utc::now()),
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&mut self, mut user: User) -> DatabaseResult<User> {
        if !self.working.users.contains_key(&user.id) {
            return Err(DatabaseError::Query(sqlx::Error::RowNotFound));
        }
        user.audit.touch(Utc::now());
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryTransaction {
    async fn find_by_user_id(&mut self, user_id: i64) -> DatabaseResult<Option<RefreshToken>> {
        Ok(self
            .working
            .refresh_tokens
            .get(&user_id)
            .filter(|t| t.audit.deleted_at.is_none())
            .cloned())
    }

    async fn save(&mut self, mut token: RefreshToken) -> DatabaseResult<RefreshToken> {
        let now = Utc::now();
        token.audit = match self.working.refresh_tokens.get(&token.user_id) {
            Some(existing) => {
                let mut audit = existing.audit.clone();
                audit.touch(now);
                audit.deleted_at = None;
                audit
            }
            None => Audit::created(now),
        };
        self.working
            .refresh_tokens
            .insert(token.user_id, token.clone());
        Ok(token)
    }

    async fn delete_by_user_id(&mut self, user_id: i64) -> DatabaseResult<bool> {
        Ok(self.working.refresh_tokens.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.users().create(&new_user("alice")).await.unwrap();
        }

        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.users().create(&new_user("alice")).await.unwrap();
        tx.refresh_tokens()
            .save(RefreshToken::new(user.id, "token".to_string()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.user_count().await, 1);
        assert_eq!(
            store.stored_refresh_token(user.id).await,
            Some("token".to_string())
        );
    }

    #[tokio::test]
    async fn test_soft_deleted_user_is_hidden_but_reserved() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.users().create(&new_user("alice")).await.unwrap();
        tx.commit().await.unwrap();
        store.soft_delete_user(user.id).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.users().find_by_username("alice").await.unwrap().is_none());
        assert!(tx.users().find_by_id(user.id).await.unwrap().is_none());
        assert!(tx.users().exists_by_username("alice").await.unwrap());
        assert!(matches!(
            tx.users().create(&new_user("alice")).await,
            Err(DatabaseError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_save_keeps_created_at() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.users().create(&new_user("alice")).await.unwrap();

        let first = tx
            .refresh_tokens()
            .save(RefreshToken::new(user.id, "one".to_string()))
            .await
            .unwrap();
        let second = tx
            .refresh_tokens()
            .save(RefreshToken::new(user.id, "two".to_string()))
            .await
            .unwrap();

        assert_eq!(second.value, "two");
        assert_eq!(second.audit.created_at, first.audit.created_at);
        assert!(second.audit.updated_at >= first.audit.updated_at);
    }

    #[tokio::test]
    async fn test_soft_deleted_refresh_token_is_hidden_until_saved_again() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.users().create(&new_user("alice")).await.unwrap();
        tx.refresh_tokens()
            .save(RefreshToken::new(user.id, "one".to_string()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        store.soft_delete_refresh_token(user.id).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.refresh_tokens().find_by_user_id(user.id).await.unwrap().is_none());

        tx.refresh_tokens()
            .save(RefreshToken::new(user.id, "two".to_string()))
            .await
            .unwrap();
        let stored = tx.refresh_tokens().find_by_user_id(user.id).await.unwrap();
        assert_eq!(stored.map(|t| t.value), Some("two".to_string()));
    }
}
