pub mod enums;
pub mod leads;
pub mod payments;
pub mod webhooks;
