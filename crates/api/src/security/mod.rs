//! Request admission: CORS origin checks, rate limiting and response headers

mod admission;
mod cors;
mod headers;

pub use admission::{admission_middleware, client_ip, Admission};
pub use cors::{
    cors_layer, expand_allowed_origins, reject_disallowed_origin, OriginPolicy, DEV_PORTS,
};
pub use headers::security_headers_middleware;
