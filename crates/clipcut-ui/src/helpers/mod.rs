// crates/clipcut-ui/src/helpers/mod.rs

pub mod download;
pub mod log;
