//! Continuous internal evaluation (CIE) engine and academic calendar.
//!
//! The [`cie`] and [`academic`] modules hold the pure computations. Services and routers
//! layer storage access and HTTP on top through the seams in [`repository`].

pub mod academic;
pub mod cie;
pub mod config;
pub mod error;
pub mod ids;
pub mod repository;
pub mod telemetry;
