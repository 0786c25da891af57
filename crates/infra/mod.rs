pub mod db;
pub mod webhooks;
