pub mod serde;
pub mod time;
