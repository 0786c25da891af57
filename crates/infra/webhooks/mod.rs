pub mod http_sender;
