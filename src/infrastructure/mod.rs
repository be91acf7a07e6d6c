pub mod encore;
pub mod http;
pub mod redis;
