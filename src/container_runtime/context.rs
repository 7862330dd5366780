//! Per-container handle commands execute against (spec.md §4.6 "log
//! capture"). Every log line goes through the process-wide `log` crate
//! *and* the `container_logs` table so `container.inspect --logs` survives
//! a daemon restart — the table write is the secondary sink, `log` is the
//! primary one a human tails.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::api_client::ApiClient;
use crate::models::container::{ContainerLogEntry, LogLevel};
use crate::persistence::{container_logs, Db};

pub struct ContainerContext {
    pub db: Db,
    pub api: ApiClient,
    pub container_id: String,
    pub player_id: i64,
    /// This player's remote-API credential (spec.md §3), loaded once per
    /// run and handed to every `ApiClient` call the command makes.
    pub token: String,
    pub cancel: CancellationToken,
}

impl ContainerContext {
    pub fn new(db: Db, api: ApiClient, container_id: String, player_id: i64, token: String, cancel: CancellationToken) -> Self {
        ContainerContext { db, api, container_id, player_id, token, cancel }
    }

    async fn emit(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Debug => log::debug!("[{}] {}", self.container_id, message),
            LogLevel::Info => log::info!("[{}] {}", self.container_id, message),
            LogLevel::Warning => log::warn!("[{}] {}", self.container_id, message),
            LogLevel::Error => log::error!("[{}] {}", self.container_id, message),
        }

        let sequence = match container_logs::next_sequence(&self.db, &self.container_id).await {
            Ok(seq) => seq,
            Err(e) => {
                log::error!("[{}] failed to allocate log sequence, dropping to process log only: {}", self.container_id, e);
                return;
            }
        };
        let entry = ContainerLogEntry {
            container_id: self.container_id.clone(),
            player_id: self.player_id,
            sequence,
            timestamp: Utc::now(),
            level,
            message,
        };
        if let Err(e) = container_logs::append(&self.db, &entry).await {
            log::error!("[{}] failed to persist log entry, continuing: {}", self.container_id, e);
        }
    }

    pub async fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message.into()).await;
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into()).await;
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message.into()).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into()).await;
    }
}
