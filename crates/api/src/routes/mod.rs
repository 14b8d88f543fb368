//! Route Handlers

pub mod features;
pub mod health;
pub mod predictions;
