//! Infrastructure layer: concrete implementations of the domain interfaces.

pub mod auth;
pub mod dto;
pub mod liveness;
pub mod registry;
pub mod repository;
