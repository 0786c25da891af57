pub mod client_ip;
pub mod default_routers;
pub mod error_responses;
pub mod http_serve;
pub mod rate_limit;
pub mod routers;
