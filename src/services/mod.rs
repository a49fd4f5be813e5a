// src/services/mod.rs

pub mod access;
pub mod exams;
pub mod questions;
pub mod submission;
