//! # Engine Module
//!
//! Fill-and-transfer engine implementation.
//!
//! This module contains all core building blocks such as:
//! - Axes, tensor shapes and index conventions
//! - Atomic and single-threaded bin storage
//! - Argument classification, broadcasting and weight combination
//! - The shared fill histogram and its helper lifecycle
//! - Bin transfer into result histograms
//! - The threading policy and a rayon event driver
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod threading;
pub mod axis;
pub mod tensor;
pub mod accumulator;
pub mod storage;
pub mod weight;
pub mod args;
pub mod histogram;
pub mod transfer;
pub mod result;
pub mod action;
pub mod helper;
pub mod scheduler;
