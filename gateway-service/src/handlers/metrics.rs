pub async fn metrics() -> String {
    service_core::observability::render_metrics()
}
