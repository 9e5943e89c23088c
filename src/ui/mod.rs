pub mod markdown;
pub mod plain;
pub mod transcript;
