#![doc = "spice-core: orchestration logic for the spice CLI."]

//! This crate sequences the two external engines behind the `spice` command:
//! the surveyor (payload → ADG files) and the uploader (ADGs or deployment
//! events → Spice Labs). It owns validation, defaulting, output layout, and
//! credential diagnostics; the engines themselves live behind the traits in
//! [`contract`].
//!
//! # Usage
//! Build a [`config::Configuration`], hand it to an [`orchestrator::Orchestrator`]
//! with concrete engines (see [`engines`]) and call `run`.

pub mod config;
pub mod contract;
pub mod credential;
pub mod engine_log;
pub mod engines;
pub mod error;
pub mod kv_args;
pub mod layout;
pub mod orchestrator;
