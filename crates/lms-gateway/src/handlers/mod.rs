//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod aggregate;
pub mod all;
pub mod courses;
pub mod health;
