//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::GatewayError;
use crate::server::handlers::*;
use crate::server::state::ServerState;

/// Build the HTTP router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Operators
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/api/admin/users", get(list_users_handler))
        .route("/api/admin/users/{id}/role", post(assign_role_handler))
        // Device registry
        .route("/api/routers", get(list_devices_handler).post(add_device_handler))
        .route("/api/routers/{id}", delete(remove_device_handler))
        // Monitoring
        .route("/api/{id}/system/resource", get(resource_handler))
        .route("/api/{id}/system/monitor", get(monitor_handler))
        .route("/api/{id}/interface", get(interfaces_handler))
        .route("/api/{id}/interface/monitor", get(monitor_traffic_handler))
        // Device controls
        .route("/api/{id}/system/reboot", post(reboot_handler))
        .route("/api/{id}/run", post(run_handler))
        // Tables
        .route("/api/{id}/ip/address", get(addresses_handler).post(add_address_handler))
        .route("/api/{id}/ip/address/{item}", delete(remove_address_handler))
        .route(
            "/api/{id}/firewall/filter",
            get(filter_rules_handler).post(add_filter_rule_handler),
        )
        .route("/api/{id}/firewall/filter/{item}", delete(remove_filter_rule_handler))
        .route("/api/{id}/nat", get(nat_rules_handler).post(add_nat_rule_handler))
        .route("/api/{id}/nat/{item}", delete(remove_nat_rule_handler))
        .route("/api/{id}/bridge", get(bridges_handler))
        .route("/api/{id}/vlan", get(vlans_handler).post(add_vlan_handler))
        .route("/api/{id}/vlan/{item}", delete(remove_vlan_handler))
        .route("/api/{id}/queue/simple", get(queues_handler).post(add_queue_handler))
        .route("/api/{id}/queue/simple/{item}", delete(remove_queue_handler))
        .route("/api/{id}/dhcp/lease", get(dhcp_leases_handler))
        .route(
            "/api/{id}/router-users",
            get(device_users_handler).post(add_device_user_handler),
        )
        .route("/api/{id}/router-users/{item}", delete(remove_device_user_handler))
        .route(
            "/api/{id}/hotspot/users",
            get(hotspot_users_handler).post(add_hotspot_user_handler),
        )
        .route("/api/{id}/hotspot/users/{item}", delete(remove_hotspot_user_handler))
        .route("/api/{id}/capsman/registrations", get(capsman_handler))
        // Export and backups
        .route("/api/{id}/export", get(export_handler))
        .route("/api/{id}/backup", post(backup_handler))
        .route("/api/backups", get(list_backups_handler))
        .route("/backups/{name}", get(read_backup_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), GatewayError>>, GatewayError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))
    });

    Ok(handle)
}
