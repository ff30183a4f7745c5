//! Subcommand implementations

use crate::cli::Commands;
use crate::config::WellsyncConfig;
use crate::errors::CliError;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use wellsync_events::EventHistory;
use wellsync_queue::{EnqueueOptions, TaskQueue};
use wellsync_resource::{HydratedResource, ResourceOptions, SyncContext};
use wellsync_storage::{FileStorage, Storage, remove_from_storage};

/// Result of a command, printed once the event pipeline has drained
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// JSON printed on stdout
    pub value: Value,
    /// Append a count of queue events to the output
    pub summarize_events: bool,
}

impl CommandOutput {
    fn plain(value: Value) -> Self {
        Self {
            value,
            summarize_events: false,
        }
    }

    /// Final JSON, with an `events` summary taken from `history` when requested
    #[must_use]
    pub fn into_value(self, history: &EventHistory) -> Value {
        let mut value = self.value;
        if self.summarize_events
            && let Value::Object(map) = &mut value
        {
            map.insert(
                "events".to_string(),
                json!({
                    "attempts": history.by_type("task.started").len(),
                    "superseded": history.by_type("task.superseded").len(),
                    "saved": history.by_type("resource.saved").len(),
                }),
            );
        }
        value
    }
}

/// A file store plus the queue its writes go through
#[derive(Debug, Clone)]
pub struct Session {
    store: Arc<FileStorage>,
    context: SyncContext,
    config: WellsyncConfig,
}

impl Session {
    /// Open a session on the file store at `store_dir`
    #[must_use]
    pub fn new(config: &WellsyncConfig, store_dir: PathBuf) -> Self {
        let store = Arc::new(FileStorage::new(store_dir));
        let storage: Arc<dyn Storage> = store.clone();
        let context = SyncContext::new(storage, TaskQueue::new(config.queue.clone()));
        Self {
            store,
            context,
            config: config.clone(),
        }
    }

    /// The file store
    #[must_use]
    pub fn store(&self) -> &FileStorage {
        &self.store
    }

    /// Run `command` against the store
    ///
    /// # Errors
    ///
    /// Returns an error if the value argument is not JSON or a load, save or
    /// remove fails.
    #[instrument(name = "wellsync_command", skip(self), fields(store = %self.store.dir().display()))]
    pub async fn execute(&self, command: &Commands) -> Result<CommandOutput, CliError> {
        match command {
            Commands::Get { key } => self.get(key).await.map(CommandOutput::plain),
            Commands::Set { key, value } => self.set(key, value).await.map(CommandOutput::plain),
            Commands::Remove { key } => self.remove(key).await.map(CommandOutput::plain),
            Commands::Burst { key, count } => {
                let value = self.burst(key, *count).await?;
                Ok(CommandOutput {
                    value,
                    summarize_events: true,
                })
            }
        }
    }

    fn options(&self) -> ResourceOptions<Value> {
        ResourceOptions::default().load_retry_delay(self.config.queue.retry_delay)
    }

    async fn get(&self, key: &str) -> Result<Value, CliError> {
        let resource =
            HydratedResource::open(self.context.clone(), key, Value::Null, self.options()).await;
        if let Some(err) = resource.status().load_error {
            return Err(err.into());
        }
        Ok(resource.data())
    }

    async fn set(&self, key: &str, raw: &str) -> Result<Value, CliError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| CliError::invalid_value(e.to_string()))?;

        // A single write has nothing to coalesce with
        let options = self.options().persist(EnqueueOptions::immediate());
        let resource = HydratedResource::new(self.context.clone(), key, Value::Null, options);

        let stored = resource.replace(value).await;
        if let Some(err) = resource.status().save_error {
            return Err(err.into());
        }
        Ok(stored)
    }

    async fn remove(&self, key: &str) -> Result<Value, CliError> {
        remove_from_storage(self.store.as_ref(), key).await?;
        Ok(json!({ "removed": key }))
    }

    async fn burst(&self, key: &str, count: u32) -> Result<Value, CliError> {
        let resource = HydratedResource::open(
            self.context.clone(),
            key,
            json!({ "count": 0 }),
            self.options(),
        )
        .await;
        if let Some(err) = resource.status().load_error {
            return Err(err.into());
        }

        let pending: Vec<_> = (0..count).map(|_| resource.set_data(increment)).collect();
        for save in pending {
            save.await;
        }

        if let Some(err) = resource.status().save_error {
            return Err(err.into());
        }

        let value = resource.data();
        info!(key, count, "Burst applied");
        Ok(json!({ "key": key, "updates": count, "value": value }))
    }
}

/// Bump the `count` field, keeping any other fields
fn increment(previous: &Value) -> Value {
    let mut next = match previous {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    let count = next.get("count").and_then(Value::as_u64).unwrap_or(0);
    next.insert("count".to_string(), json!(count + 1));
    Value::Object(next)
}
