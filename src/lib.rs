//! gridiron-edge: NFL game prediction pipeline
//!
//! This library provides the core components for:
//! - Merging upstream per-team weekly statistics into a team-week table
//! - Assembling symmetric home/away matchup rows with delta features
//! - Declarative model-input selection shared by training and prediction
//! - Gradient-boosted margin and total models with time-ordered validation
//! - Weekly predictions with win probabilities and market edges
//! - Parquet storage, TOML configuration and structured logging

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod predict;
pub mod telemetry;
pub mod training;
