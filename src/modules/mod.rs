pub mod ads;
pub mod callback;
pub mod transcode;
