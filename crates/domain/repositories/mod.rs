pub mod leads;
pub mod merchants;
pub mod payments;
pub mod webhooks;
