pub mod cardcast_client;

pub use cardcast_client::CardcastClient;
