pub mod serde_flex;
pub mod time;
pub mod validation;
