//! Thin consumers built entirely on the public [`crate::scheduler::traverse`] API.

pub mod copy;
pub mod delete;
pub mod diff;

#[cfg(feature = "remote-sync")]
pub mod upload;
