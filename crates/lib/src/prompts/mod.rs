//! # Prompt Template Modules
//!
//! This module organizes all prompt templates used by the extraction schemas.
//! It is divided into sub-modules based on the extraction target.

pub mod core;
pub mod flight;
pub mod sanity;
