// crates/clipcut-core/src/helpers/mod.rs

pub mod time;
