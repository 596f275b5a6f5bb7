use async_trait::async_trait;
use ::redis::AsyncCommands;

use super::{decode, JobStore, StoreError};
use crate::models::{JobCategory, PostingSet};

const KEY_PREFIX: &str = "evaluator:postings:";

/// One JSON string per category. `SET` replaces the value atomically.
#[derive(Clone)]
pub struct RedisJobStore {
    client: ::redis::Client,
}

impl RedisJobStore {
    pub fn new(client: ::redis::Client) -> Self {
        Self { client }
    }

    fn key(category: &JobCategory) -> String {
        format!("{KEY_PREFIX}{}", category.cache_key())
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn load(&self, category: &JobCategory) -> Result<Option<PostingSet>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<Vec<u8>> = conn.get(Self::key(category)).await?;
        raw.map(|bytes| decode(category, &bytes)).transpose()
    }

    async fn save(&self, category: &JobCategory, set: &PostingSet) -> Result<(), StoreError> {
        let json = serde_json::to_string(set)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(Self::key(category), json).await?;
        Ok(())
    }
}
