//! Pipelines
//!
//! A queued batch of provider commands executed together, with replies
//! returned in queue order.

use crate::error::Result;
use crate::provider::{CacheProvider, Payload};

// == Commands ==
/// One queued provider command.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCommand {
    Get(String),
    Set {
        key: String,
        payload: Payload,
        ttl: Option<u64>,
    },
    Del(String),
    Expire { key: String, ttl: u64 },
}

// == Replies ==
/// Reply to one queued command, at the same position as the command.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineReply {
    /// Reply to `Get`
    Value(Option<Payload>),
    /// Reply to `Set`
    Ok,
    /// Reply to `Del`: number of keys removed
    Removed(u64),
    /// Reply to `Expire`: whether a TTL was applied
    Applied(bool),
}

// == Pipeline Builder ==
/// Builder returned by [`CacheProvider::pipeline`](crate::provider::CacheProvider).
///
/// ```ignore
/// let replies = provider
///     .pipeline()
///     .set("a", payload, Some(60))
///     .get("a")
///     .exec()
///     .await?;
/// ```
pub struct Pipeline<'a> {
    provider: &'a dyn CacheProvider,
    commands: Vec<PipelineCommand>,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn CacheProvider) -> Self {
        Self {
            provider,
            commands: Vec::new(),
        }
    }

    pub fn get(mut self, key: impl Into<String>) -> Self {
        self.commands.push(PipelineCommand::Get(key.into()));
        self
    }

    pub fn set(mut self, key: impl Into<String>, payload: Payload, ttl: Option<u64>) -> Self {
        self.commands.push(PipelineCommand::Set {
            key: key.into(),
            payload,
            ttl,
        });
        self
    }

    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.commands.push(PipelineCommand::Del(key.into()));
        self
    }

    pub fn expire(mut self, key: impl Into<String>, ttl: u64) -> Self {
        self.commands.push(PipelineCommand::Expire {
            key: key.into(),
            ttl,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    // == Exec ==
    /// Runs all queued commands; an empty pipeline never reaches the backend.
    pub async fn exec(self) -> Result<Vec<PipelineReply>> {
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }
        self.provider.exec_pipeline(self.commands).await
    }
}
