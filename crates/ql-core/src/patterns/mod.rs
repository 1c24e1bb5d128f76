//! Patterns sub-module.

pub mod lazy_object;
