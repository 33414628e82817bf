//! Truth Serum: response integrity verification for side-effecting actions.
//!
//! Agents in the surrounding platform report `success: true` for actions such
//! as publishing a post. This crate probes each monitored action endpoint
//! once, classifies the raw HTTP response as a verified claim, an honest
//! failure, an honestly disabled target, or a fabrication, and turns the run
//! into a report plus a CI-friendly exit code.
//!
//! See `DESIGN.md` for the architecture and decision log.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod targets;

pub mod classifier;
pub mod probe;
pub mod resolver;

pub mod audit;
pub mod exit_code;
pub mod report;

pub mod run;
