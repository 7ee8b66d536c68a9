//! Domain layer containing business entities and ports.
//!
//! This module implements the core domain logic following Clean Architecture principles.
//! It defines entities, repository interfaces and the outbound ports (identity
//! providers, captcha, id codec) independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`identity`] - Identity provider port and normalized assertions
//! - [`captcha`] - Captcha verification port
//! - [`codec`] - Id/hash bijection port
//! - [`link_sweeper`] - Background retirement of expired links
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Business logic is encapsulated in services (see [`crate::application::services`])

pub mod captcha;
pub mod codec;
pub mod entities;
pub mod identity;
pub mod link_sweeper;
pub mod repositories;
