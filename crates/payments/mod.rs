pub mod api_keys;
pub mod reference_code;
pub mod webhook_signature;
