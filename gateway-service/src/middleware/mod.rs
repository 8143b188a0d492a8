pub mod context;
pub mod metrics;
pub mod request_id;
pub mod session_trust;

pub use context::{context_middleware, ContextResolver, Ctx};
pub use self::metrics::metrics_middleware;
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
pub use session_trust::{GuardOptions, SessionTrustGate, TrustState};
