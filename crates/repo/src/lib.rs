// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! rb-repo: transactional OTU repository on top of the event log

pub mod config;
pub mod error;
pub mod lock;
pub mod repo;
pub mod transaction;

pub use config::RepoConfig;
pub use error::RepoError;
pub use lock::Lock;
pub use repo::{locked_repo, NewRepo, NewSequence, Repo};
pub use transaction::Outcome;
