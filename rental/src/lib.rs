//! Car rental service.
//!
//! A catalog of cars, user accounts, bookings paid through a hosted
//! checkout page, and reviews. The interesting part is keeping the local
//! order record in step with the payment processor:
//!
//! ```text
//!   POST /api/checkout ──► processor session ──► order (pending)
//!                                                  │
//!          ┌───────────────────────────────────────┼─────────────────────┐
//!          ▼                                       ▼                     ▼
//!   signed webhook                       POST /orders/verify-payment   POST /orders/cancel
//!          │                                       │                     │
//!          └──────────────► transition(session, pending → paid | cancelled)
//! ```
//!
//! Every path ends in the same conditional transition, which only moves a
//! `pending` order. Whichever signal arrives first decides the outcome and
//! the others become no-ops.
//!
//! # Modules
//!
//! - [`catalog`], [`identity`], [`orders`], [`reviews`]: domain logic, each
//!   with a repository trait
//! - [`payments`]: processor gateway and webhook signatures
//! - [`stores`]: `PostgreSQL` and Redis implementations of the repositories
//! - [`api`] and [`server`]: axum handlers, router and shared state
//! - `mocks`: in-memory implementations for tests (feature `test-utils`)

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod environment;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod server;
pub mod stores;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod mocks;

pub use config::Config;
pub use error::{RentalError, Result};
