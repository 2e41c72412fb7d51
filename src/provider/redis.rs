//! Redis cache provider
//!
//! Networked provider storing serialized payloads as Redis strings, so a
//! cache can be shared between processes and survive restarts.
//!
//! ## Features
//! - TTL support via `SET ... EX` and `EXPIRE`
//! - Batched reads with `MGET` and batched writes through pipelines
//! - One lazily opened multiplexed connection shared by all callers

use ::redis::{aio::MultiplexedConnection, Client, Value};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{CacheError, Result};
use crate::provider::{
    CacheProvider, Payload, PipelineCommand, PipelineReply, SerializationOptions,
};

/// Redis-backed cache provider
pub struct RedisCacheProvider {
    client: Client,
    connection: OnceCell<MultiplexedConnection>,
    serialization: SerializationOptions,
}

impl RedisCacheProvider {
    /// Creates a provider for a connection URL (e.g. "redis://localhost:6379").
    ///
    /// No connection is opened until the first command.
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Connection(format!("invalid redis url {}: {}", url, e)))?;

        info!("Redis cache provider created for {}", url);

        Ok(Self {
            client,
            connection: OnceCell::new(),
            serialization: SerializationOptions::default(),
        })
    }

    /// Sets the hooks used to marshal values to and from text.
    pub fn with_serialization(mut self, serialization: SerializationOptions) -> Self {
        self.serialization = serialization;
        self
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| {
                        warn!("Redis connection failed: {}", e);
                        CacheError::Connection(format!("failed to connect to redis: {}", e))
                    })
            })
            .await?;
        Ok(conn.clone())
    }

    /// Checks that the server answers.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::UnexpectedReply(format!("PING answered {}", pong)))
        }
    }

    /// Removes every key of the selected database.
    pub async fn flushdb(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = ::redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    fn to_text(&self, payload: Payload) -> Result<String> {
        match payload {
            Payload::Text(text) => Ok(text),
            Payload::Object(value) => self.serialization.serialize(value),
        }
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn serialization_options(&self) -> SerializationOptions {
        self.serialization.clone()
    }

    async fn get(&self, key: &str) -> Result<Option<Payload>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = ::redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value.map(Payload::Text))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Payload>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let values: Vec<Option<String>> = ::redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        Ok(values.into_iter().map(|v| v.map(Payload::Text)).collect())
    }

    async fn set(&self, key: &str, payload: Payload, ttl: Option<u64>) -> Result<()> {
        let text = self.to_text(payload)?;
        let mut conn = self.connection().await?;

        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(text);
        if let Some(ttl) = ttl.filter(|ttl| *ttl > 0) {
            cmd.arg("EX").arg(ttl);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn mset(&self, entries: Vec<(String, Payload)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut cmd = ::redis::cmd("MSET");
        for (key, payload) in entries {
            cmd.arg(key).arg(self.to_text(payload)?);
        }

        let mut conn = self.connection().await?;
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = ::redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl: u64) -> Result<bool> {
        let mut conn = self.connection().await?;
        let applied: i64 = ::redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl)
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }

    async fn exec_pipeline(&self, commands: Vec<PipelineCommand>) -> Result<Vec<PipelineReply>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = ::redis::pipe();
        for command in &commands {
            match command {
                PipelineCommand::Get(key) => {
                    pipe.cmd("GET").arg(key);
                }
                PipelineCommand::Set { key, payload, ttl } => {
                    pipe.cmd("SET").arg(key).arg(self.to_text(payload.clone())?);
                    if let Some(ttl) = ttl.filter(|ttl| *ttl > 0) {
                        pipe.arg("EX").arg(ttl);
                    }
                }
                PipelineCommand::Del(key) => {
                    pipe.cmd("DEL").arg(key);
                }
                PipelineCommand::Expire { key, ttl } => {
                    pipe.cmd("EXPIRE").arg(key).arg(*ttl);
                }
            }
        }

        let mut conn = self.connection().await?;
        let raw: Vec<Value> = pipe.query_async(&mut conn).await?;

        if raw.len() != commands.len() {
            return Err(CacheError::UnexpectedReply(format!(
                "pipeline of {} commands returned {} replies",
                commands.len(),
                raw.len()
            )));
        }

        commands
            .iter()
            .zip(raw)
            .map(|(command, value)| decode_reply(command, value))
            .collect()
    }
}

/// Maps a raw Redis reply onto the reply shape of its command.
fn decode_reply(command: &PipelineCommand, value: Value) -> Result<PipelineReply> {
    let reply = match (command, value) {
        (PipelineCommand::Get(_), Value::Nil) => PipelineReply::Value(None),
        (PipelineCommand::Get(_), Value::BulkString(bytes)) => {
            let text = String::from_utf8(bytes)
                .map_err(|e| CacheError::Serialization(format!("non-utf8 value: {}", e)))?;
            PipelineReply::Value(Some(Payload::Text(text)))
        }
        (PipelineCommand::Get(_), Value::SimpleString(text)) => {
            PipelineReply::Value(Some(Payload::Text(text)))
        }
        (PipelineCommand::Set { .. }, Value::Okay) => PipelineReply::Ok,
        (PipelineCommand::Set { .. }, Value::SimpleString(_)) => PipelineReply::Ok,
        (PipelineCommand::Del(_), Value::Int(n)) => PipelineReply::Removed(n.max(0) as u64),
        (PipelineCommand::Expire { .. }, Value::Int(n)) => PipelineReply::Applied(n == 1),
        (command, other) => {
            return Err(CacheError::UnexpectedReply(format!(
                "{:?} answered {:?}",
                command, other
            )))
        }
    };
    Ok(reply)
}
