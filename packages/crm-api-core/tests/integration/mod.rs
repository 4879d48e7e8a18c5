//! Integration tests for the entity API.
//!
//! 1. CRUD through the built-in entities
//! 2. Custom groups, custom fields and their values
//! 3. Concurrent access to one entity

pub mod concurrency_tests;
pub mod crud_tests;
pub mod custom_data_tests;
pub mod helpers;
