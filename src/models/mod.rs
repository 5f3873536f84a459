// src/models/mod.rs

pub mod question;
pub mod score;
pub mod session;
