//! Disabled cache provider
//!
//! Accepts every command and stores nothing, so every read is a miss. Useful
//! to switch memoization off without changing call sites.

use async_trait::async_trait;

use crate::error::Result;
use crate::provider::{CacheProvider, Payload, PipelineCommand, PipelineReply};

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCacheProvider;

impl DisabledCacheProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheProvider for DisabledCacheProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<Payload>> {
        Ok(None)
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Payload>>> {
        Ok(vec![None; keys.len()])
    }

    async fn set(&self, _key: &str, _payload: Payload, _ttl: Option<u64>) -> Result<()> {
        Ok(())
    }

    async fn mset(&self, _entries: Vec<(String, Payload)>) -> Result<()> {
        Ok(())
    }

    async fn del(&self, _keys: &[String]) -> Result<u64> {
        Ok(0)
    }

    async fn expire(&self, _key: &str, _ttl: u64) -> Result<bool> {
        Ok(false)
    }

    async fn exec_pipeline(&self, commands: Vec<PipelineCommand>) -> Result<Vec<PipelineReply>> {
        Ok(commands
            .iter()
            .map(|command| match command {
                PipelineCommand::Get(_) => PipelineReply::Value(None),
                PipelineCommand::Set { .. } => PipelineReply::Ok,
                PipelineCommand::Del(_) => PipelineReply::Removed(0),
                PipelineCommand::Expire { .. } => PipelineReply::Applied(false),
            })
            .collect())
    }
}
