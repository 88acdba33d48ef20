// src/handlers/mod.rs

pub mod attempt;
pub mod auth;
pub mod course;
