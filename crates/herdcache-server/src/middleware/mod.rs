//! Middleware stack para el servidor HTTP.
//!
//! Se aplica a todas las rutas, incluidas /metrics y /health:
//! - `RequestIdLayer`: propaga un X-Request-Id valido o genera uno nuevo
//! - `LoggingLayer`: logging estructurado de cada request

mod logging;
mod request_id;

pub use logging::{LoggingLayer, LoggingMiddleware};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer, RequestIdMiddleware};
