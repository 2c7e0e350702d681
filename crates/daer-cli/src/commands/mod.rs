// SPDX-License-Identifier: MIT

//! CLI command implementations

pub mod dag;
pub mod run;
