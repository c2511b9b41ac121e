use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use lavender_shared::MapVariant;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Mapping counts for the variants already loaded into the cache. Variants
/// nobody has asked for yet report `null` rather than touching the store.
fn cached_mapping_counts(state: &AppState) -> Vec<(MapVariant, Option<usize>)> {
    MapVariant::ALL
        .iter()
        .map(|variant| {
            let count = state.registries.get(variant).map(|entry| entry.len());
            (*variant, count)
        })
        .collect()
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    let mappings: serde_json::Map<String, serde_json::Value> = cached_mapping_counts(&state)
        .into_iter()
        .map(|(variant, count)| (variant.as_str().to_owned(), serde_json::json!(count)))
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "storage": state.store.backend(),
        "writes_enabled": state.admin_token.is_some(),
        "mappings": mappings,
        "observability": {
            "registry_reads_total": observability.registry_reads_total,
            "registry_writes_total": observability.registry_writes_total,
            "store_failures_total": observability.store_failures_total,
            "rejected_writes_total": observability.rejected_writes_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let mapping_counts = cached_mapping_counts(&state);
    let persistent = state.store.backend() == "postgres";
    let observability = state.observability.snapshot();

    let body = render_prometheus_metrics(&mapping_counts, persistent, observability);

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    mapping_counts: &[(MapVariant, Option<usize>)],
    persistent: bool,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP lavender_color_mappings Color mappings currently cached per map variant."
    );
    let _ = writeln!(body, "# TYPE lavender_color_mappings gauge");
    for (variant, count) in mapping_counts {
        if let Some(count) = count {
            let _ = writeln!(
                body,
                "lavender_color_mappings{{variant=\"{variant}\"}} {count}"
            );
        }
    }

    let _ = writeln!(
        body,
        "# HELP lavender_persistent_storage Whether mappings are stored in PostgreSQL (1 or 0)."
    );
    let _ = writeln!(body, "# TYPE lavender_persistent_storage gauge");
    let _ = writeln!(
        body,
        "lavender_persistent_storage {}",
        u8::from(persistent)
    );

    let counters = [
        (
            "lavender_registry_reads_total",
            "Total map color list requests.",
            observability.registry_reads_total,
        ),
        (
            "lavender_registry_writes_total",
            "Total successful map color writes.",
            observability.registry_writes_total,
        ),
        (
            "lavender_store_failures_total",
            "Total failed writes to the key-value store.",
            observability.store_failures_total,
        ),
        (
            "lavender_rejected_writes_total",
            "Total map color writes rejected for missing or wrong credentials.",
            observability.rejected_writes_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::store::KvStore;

    async fn spawn_test_server(state: AppState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    #[test]
    fn metrics_output_contains_prometheus_help_type_and_values() {
        let observability = ObservabilitySnapshot {
            registry_reads_total: 12,
            registry_writes_total: 3,
            store_failures_total: 1,
            rejected_writes_total: 7,
        };
        let counts = [
            (MapVariant::PrincipalStates, Some(42)),
            (MapVariant::TradingCompanies, None),
            (MapVariant::Presidencies, Some(15)),
        ];

        let metrics = render_prometheus_metrics(&counts, true, observability);

        assert!(metrics.contains("# HELP lavender_color_mappings"));
        assert!(metrics.contains("# TYPE lavender_registry_reads_total counter"));
        assert!(metrics.contains("lavender_color_mappings{variant=\"principal-states\"} 42"));
        assert!(metrics.contains("lavender_color_mappings{variant=\"presidencies\"} 15"));
        assert!(!metrics.contains("variant=\"trading-companies\""));
        assert!(metrics.contains("lavender_persistent_storage 1"));
        assert!(metrics.contains("lavender_registry_reads_total 12"));
        assert!(metrics.contains("lavender_registry_writes_total 3"));
        assert!(metrics.contains("lavender_store_failures_total 1"));
        assert!(metrics.contains("lavender_rejected_writes_total 7"));
    }

    #[tokio::test]
    async fn health_and_metrics_expose_expected_contract() {
        let state = AppState::new(KvStore::memory(), None);
        let (addr, server_handle) = spawn_test_server(state).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        client
            .get(format!("{base_url}/api/map-colors/presidencies"))
            .send()
            .await
            .expect("map colors request")
            .error_for_status()
            .expect("map colors status");

        let health = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");

        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(
            health.get("storage").and_then(|v| v.as_str()),
            Some("memory")
        );
        assert_eq!(
            health.get("writes_enabled").and_then(|v| v.as_bool()),
            Some(false)
        );
        assert_eq!(
            health
                .get("mappings")
                .and_then(|v| v.get("presidencies"))
                .and_then(|v| v.as_u64()),
            Some(0)
        );
        assert!(
            health
                .get("mappings")
                .and_then(|v| v.get("principal-states"))
                .is_some_and(|v| v.is_null())
        );
        assert_eq!(
            health
                .get("observability")
                .and_then(|v| v.get("registry_reads_total"))
                .and_then(|v| v.as_u64()),
            Some(1)
        );

        let metrics = client
            .get(format!("{base_url}/api/metrics"))
            .send()
            .await
            .expect("metrics request")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("parse metrics text");

        assert!(metrics.contains("# TYPE lavender_registry_reads_total counter"));
        assert!(metrics.contains("# TYPE lavender_persistent_storage gauge"));
        assert!(metrics.contains("lavender_registry_reads_total 1"));
        assert!(metrics.contains("lavender_persistent_storage 0"));
        assert!(metrics.contains("lavender_color_mappings{variant=\"presidencies\"} 0"));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
