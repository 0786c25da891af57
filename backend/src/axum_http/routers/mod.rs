pub mod admin;
pub mod leads;
pub mod payments;
