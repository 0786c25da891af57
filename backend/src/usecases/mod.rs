pub mod admin;
pub mod leads;
pub mod payment_validation;
pub mod payments;
pub mod rate_limiter;
pub mod webhook_dispatcher;
