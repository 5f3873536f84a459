// src/utils/mod.rs

pub mod fs;
