//! Jobsift - live job-list filtering engine
//!
//! Classifies the items of a third-party job list by client spend and
//! proposal count, hides the ones that fail the user's thresholds, and
//! keeps that state consistent while the page re-renders the list,
//! navigates client-side, and the thresholds change at runtime.

pub mod cli;
pub mod config;
pub mod dom;
pub mod error;
pub mod filtering;
pub mod navigation;
pub mod orchestrator;
pub mod parsers;
pub mod runtime;
pub mod schedule;

pub use error::{Result, SiftError};
