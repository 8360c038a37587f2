//! Resource monitoring summary

use crate::executor::Record;

pub use openapi_server::models::MonitorResponse;

/// Extract the well-known figures from a `/system/resource/print` record.
/// Fields that are missing or do not parse are left empty.
pub fn summarize(resource: Record) -> MonitorResponse {
    let number = |key: &str| resource.get(key).and_then(|v| v.trim().parse::<u64>().ok());
    let text = |key: &str| resource.get(key).filter(|v| !v.is_empty()).cloned();

    MonitorResponse {
        cpu_load: resource
            .get("cpu-load")
            .and_then(|v| v.trim().trim_end_matches('%').parse::<u8>().ok()),
        free_memory: number("free-memory"),
        total_memory: number("total-memory"),
        uptime: text("uptime"),
        version: text("version"),
        board_name: text("board-name"),
        resource,
    }
}
