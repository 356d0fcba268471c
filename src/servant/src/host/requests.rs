//! Request counters for the API itself

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// In-flight and GET request counters
pub struct RequestMetrics {
    started: Instant,
    get_requests: AtomicU64,
    in_flight: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            get_requests: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    /// Requests currently being served
    pub fn current_connections(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// GET requests per second, averaged since startup
    pub fn average_get_requests_per_second(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.get_requests.load(Ordering::Relaxed) as f64 / elapsed
    }

    fn begin(&self, method: &Method) -> InFlight<'_> {
        if *method == Method::GET {
            self.get_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlight(self)
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when the request finishes or is dropped
struct InFlight<'a>(&'a RequestMetrics);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Middleware feeding `RequestMetrics`
pub async fn track_requests(
    State(metrics): State<Arc<RequestMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let _in_flight = metrics.begin(request.method());
    next.run(request).await
}
