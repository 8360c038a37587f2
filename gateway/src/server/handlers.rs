//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use serde_json::Value;

use crate::authn::Grant;
use crate::errors::GatewayError;
use crate::executor::Record;
use crate::facade::monitor::MonitorResponse;
use crate::facade::operations::{DeviceChange, Table};
use crate::registry::{DeviceSummary, NewDevice};
use crate::server::extract::{Caller, JsonBody};
use crate::server::state::ServerState;
use crate::snapshot::store::BackupEntry;
use crate::utils::version_info;

use openapi_server::models::{
    AddDeviceRequest, AddDeviceResponse, AddressRequest, BackupResponse, CredentialsRequest,
    DeviceUserRequest, ExportResponse, FilterRuleRequest, HealthResponse, HotspotUserRequest,
    MonitorQuery, MutationResponse, NatRuleRequest, OkResponse, QueueRequest,
    RoleUpdateRequest, RoleUpdateResponse, RunRequest, TokenResponse, UserProfile,
    VersionResponse, VlanRequest,
};

type ApiResult<T> = Result<Json<T>, GatewayError>;
type AppState = State<Arc<ServerState>>;

// ---- status ----

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "routergate".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

// ---- operators ----

fn token_response(grant: Grant) -> TokenResponse {
    TokenResponse {
        ok: true,
        token: grant.token,
        profile: Some(grant.profile),
    }
}

pub async fn register_handler(
    State(state): AppState,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> ApiResult<TokenResponse> {
    let grant = state.gateway.register(&req.username, &req.password).await?;
    Ok(Json(token_response(grant)))
}

pub async fn login_handler(
    State(state): AppState,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> ApiResult<TokenResponse> {
    let grant = state.gateway.login(&req.username, &req.password).await?;
    Ok(Json(token_response(grant)))
}

pub async fn list_users_handler(
    State(state): AppState,
    Caller(caller): Caller,
) -> ApiResult<Vec<UserProfile>> {
    Ok(Json(state.gateway.list_users(&caller).await?))
}

pub async fn assign_role_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(user_id): Path<String>,
    JsonBody(req): JsonBody<RoleUpdateRequest>,
) -> ApiResult<RoleUpdateResponse> {
    let profile = state.gateway.assign_role(&caller, &user_id, &req.role).await?;
    Ok(Json(RoleUpdateResponse {
        ok: true,
        id: profile.id,
        role: profile.role,
    }))
}

// ---- device registry ----

pub async fn list_devices_handler(
    State(state): AppState,
    Caller(caller): Caller,
) -> ApiResult<Vec<DeviceSummary>> {
    Ok(Json(state.gateway.list_devices(&caller).await?))
}

pub async fn add_device_handler(
    State(state): AppState,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<AddDeviceRequest>,
) -> ApiResult<AddDeviceResponse> {
    let device = NewDevice {
        host: req.host,
        username: req.user,
        secret: req.pass.map(SecretString::from),
        port: req.port,
    };
    let id = state.gateway.add_device(&caller, device).await?;
    Ok(Json(AddDeviceResponse { ok: true, id }))
}

pub async fn remove_device_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<OkResponse> {
    state.gateway.remove_device(&caller, &id).await?;
    Ok(Json(OkResponse { ok: true }))
}

// ---- monitoring ----

pub async fn resource_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<Record> {
    Ok(Json(state.gateway.resource(&caller, &id).await?))
}

pub async fn monitor_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<MonitorResponse> {
    Ok(Json(state.gateway.monitor(&caller, &id).await?))
}

pub async fn monitor_traffic_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Record> {
    let iface = query.iface.unwrap_or_default();
    Ok(Json(state.gateway.monitor_traffic(&caller, &id, &iface).await?))
}

pub async fn export_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<ExportResponse> {
    let lines = state.gateway.export(&caller, &id).await?;
    Ok(Json(ExportResponse { ok: true, lines }))
}

// ---- tables ----

async fn list_table(
    state: &ServerState,
    caller: &Caller,
    id: &str,
    table: Table,
) -> ApiResult<Vec<Record>> {
    Ok(Json(state.gateway.list(&caller.0, id, table).await?))
}

async fn apply_change(
    state: &ServerState,
    caller: &Caller,
    id: &str,
    change: DeviceChange,
) -> ApiResult<MutationResponse> {
    let out = state.gateway.apply(&caller.0, id, change).await?;
    Ok(Json(MutationResponse { ok: true, out }))
}

async fn remove_item(
    state: &ServerState,
    caller: &Caller,
    (id, item_id): (String, String),
    table: Table,
) -> ApiResult<MutationResponse> {
    apply_change(state, caller, &id, DeviceChange::Remove { table, item_id }).await
}

pub async fn interfaces_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::Interfaces).await
}

pub async fn addresses_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::Addresses).await
}

pub async fn add_address_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AddressRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddAddress(req)).await
}

pub async fn remove_address_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::Addresses).await
}

pub async fn filter_rules_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::FilterRules).await
}

pub async fn add_filter_rule_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<FilterRuleRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddFilterRule(req)).await
}

pub async fn remove_filter_rule_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::FilterRules).await
}

pub async fn nat_rules_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::NatRules).await
}

pub async fn add_nat_rule_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NatRuleRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddNatRule(req)).await
}

pub async fn remove_nat_rule_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::NatRules).await
}

pub async fn bridges_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::Bridges).await
}

pub async fn vlans_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::Vlans).await
}

pub async fn add_vlan_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<VlanRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddVlan(req)).await
}

pub async fn remove_vlan_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::Vlans).await
}

pub async fn queues_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::Queues).await
}

pub async fn add_queue_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<QueueRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddQueue(req)).await
}

pub async fn remove_queue_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::Queues).await
}

pub async fn dhcp_leases_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::DhcpLeases).await
}

pub async fn device_users_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::DeviceUsers).await
}

pub async fn add_device_user_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<DeviceUserRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddDeviceUser(req)).await
}

pub async fn remove_device_user_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::DeviceUsers).await
}

pub async fn hotspot_users_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::HotspotUsers).await
}

pub async fn add_hotspot_user_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<HotspotUserRequest>,
) -> ApiResult<MutationResponse> {
    apply_change(&state, &caller, &id, DeviceChange::AddHotspotUser(req)).await
}

pub async fn remove_hotspot_user_handler(
    State(state): AppState,
    caller: Caller,
    Path(ids): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    remove_item(&state, &caller, ids, Table::HotspotUsers).await
}

pub async fn capsman_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Record>> {
    list_table(&state, &caller, &id, Table::CapsmanRegistrations).await
}

// ---- device controls ----

pub async fn reboot_handler(
    State(state): AppState,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<OkResponse> {
    state.gateway.apply(&caller.0, &id, DeviceChange::Reboot).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// Generic whitelisted runner
pub async fn run_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RunRequest>,
) -> ApiResult<Vec<Record>> {
    let words = param_words(&req.params)?;
    Ok(Json(state.gateway.run(&caller, &id, &req.path, &words).await?))
}

/// Runner parameters arrive as JSON scalars; only strings and numbers are words
fn param_words(values: &[Value]) -> Result<Vec<String>, GatewayError> {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(GatewayError::InvalidParameters(format!(
                "parameters must be strings, got {other}"
            ))),
        })
        .collect()
}

// ---- backups ----

pub async fn backup_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<BackupResponse> {
    let files = state.gateway.take_backup(&caller, &id).await?;
    Ok(Json(BackupResponse { ok: true, files }))
}

pub async fn list_backups_handler(
    State(state): AppState,
    Caller(caller): Caller,
) -> ApiResult<Vec<BackupEntry>> {
    Ok(Json(state.gateway.list_backups(&caller).await?))
}

pub async fn read_backup_handler(
    State(state): AppState,
    Caller(caller): Caller,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let bytes = state.gateway.read_backup(&caller, &name).await?;
    let content_type = if name.ends_with(".json") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
