//! Method dispatch (spec.md §6): `container.*` requests against a
//! `Runtime`. Each handler returns the bare JSON `result` value; framing
//! and error-code mapping happen in `rpc.rs`/`mod.rs`.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::container_runtime::{Inspection, Runtime};
use crate::error::ProtocolError;
use crate::models::container::{Container, ContainerLogEntry, ContainerSpec, RestartPolicy};

pub async fn dispatch(runtime: &Runtime, method: &str, params: Value) -> Result<Value, ProtocolError> {
    match method {
        "container.create" => create(runtime, params).await,
        "container.start" => start(runtime, params).await,
        "container.stop" => stop(runtime, params).await,
        "container.remove" => remove(runtime, params).await,
        "container.list" => list(runtime, params).await,
        "container.inspect" => inspect(runtime, params).await,
        other => Err(ProtocolError::MethodNotFound(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    container_id: String,
    player_id: i64,
    container_type: String,
    config: ConfigParams,
    #[serde(default)]
    restart_policy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigParams {
    command: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    iteration_limit: Option<u32>,
    #[serde(default)]
    iteration_interval_seconds: u64,
    #[serde(default)]
    autostart: bool,
}

async fn create(runtime: &Runtime, params: Value) -> Result<Value, ProtocolError> {
    let req: CreateParams =
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;
    let restart_policy = match req.restart_policy {
        Some(s) => RestartPolicy::from_str(&s).map_err(|_| ProtocolError::InvalidParams(format!("unknown restart policy {}", s)))?,
        None => RestartPolicy::default(),
    };
    let spec = ContainerSpec {
        command: req.config.command,
        params: req.config.params,
        iteration_limit: req.config.iteration_limit,
        iteration_interval_seconds: req.config.iteration_interval_seconds,
        autostart: req.config.autostart,
    };
    let container = runtime
        .create(req.container_id, req.player_id, req.container_type, spec, restart_policy)
        .await?;
    Ok(json!({ "container_id": container.container_id, "status": container.status.to_string() }))
}

#[derive(Debug, Deserialize)]
struct ContainerIdParams {
    container_id: String,
}

async fn start(runtime: &Runtime, params: Value) -> Result<Value, ProtocolError> {
    let req: ContainerIdParams =
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;
    let status = runtime.start(&req.container_id).await?;
    Ok(json!({ "status": status.to_string() }))
}

async fn stop(runtime: &Runtime, params: Value) -> Result<Value, ProtocolError> {
    let req: ContainerIdParams =
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;
    let status = runtime.stop(&req.container_id).await?;
    Ok(json!({ "status": status.to_string() }))
}

async fn remove(runtime: &Runtime, params: Value) -> Result<Value, ProtocolError> {
    let req: ContainerIdParams =
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;
    runtime.remove(&req.container_id).await?;
    Ok(json!({ "status": "REMOVED" }))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    player_id: Option<i64>,
}

async fn list(runtime: &Runtime, params: Value) -> Result<Value, ProtocolError> {
    let req: ListParams = if params.is_null() {
        ListParams::default()
    } else {
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))?
    };
    let containers = runtime.list(req.player_id).await?;
    Ok(Value::Array(containers.iter().map(summary_json).collect()))
}

#[derive(Debug, Deserialize)]
struct InspectParams {
    container_id: String,
    #[serde(default)]
    include_logs: bool,
    #[serde(default)]
    log_limit: Option<i64>,
}

async fn inspect(runtime: &Runtime, params: Value) -> Result<Value, ProtocolError> {
    let req: InspectParams =
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))?;
    let inspection = runtime.inspect(&req.container_id, req.include_logs, req.log_limit).await?;
    Ok(full_json(&inspection))
}

/// `container.list` row shape (spec.md §6): container_id, type, status,
/// iteration, restart_count, created_at only.
fn summary_json(container: &Container) -> Value {
    json!({
        "container_id": container.container_id,
        "type": container.kind,
        "status": container.status.to_string(),
        "iteration": container.iteration,
        "restart_count": container.restart_count,
        "created_at": container.created_at.to_rfc3339(),
    })
}

/// `container.inspect` shape (spec.md §6): full record plus optional logs.
fn full_json(inspection: &Inspection) -> Value {
    let container = &inspection.container;
    let mut value = json!({
        "container_id": container.container_id,
        "player_id": container.player_id,
        "type": container.kind,
        "status": container.status.to_string(),
        "iteration": container.iteration,
        "restart_count": container.restart_count,
        "restart_policy": container.restart_policy.to_string(),
        "command": container.spec.command,
        "params": container.spec.params,
        "iteration_limit": container.spec.iteration_limit,
        "iteration_interval_seconds": container.spec.iteration_interval_seconds,
        "autostart": container.spec.autostart,
        "created_at": container.created_at.to_rfc3339(),
        "updated_at": container.updated_at.to_rfc3339(),
    });
    if let Some(logs) = &inspection.logs {
        value["logs"] = Value::Array(logs.iter().map(log_json).collect());
    }
    value
}

fn log_json(entry: &ContainerLogEntry) -> Value {
    json!({
        "sequence": entry.sequence,
        "timestamp": entry.timestamp.to_rfc3339(),
        "level": entry.level.to_string(),
        "message": entry.message,
    })
}
