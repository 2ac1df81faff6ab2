//! # Classboard Core
//!
//! Data-access core for a classroom collaboration product.
//!
//! This crate provides the storage and business-rule layer behind the product's
//! boards, planners, resource library, community feed, and sign-in identity. All
//! operations go through repository traits with two interchangeable backends: a
//! PostgreSQL implementation built on Diesel and an in-memory implementation for
//! unit testing and local development.
//!
//! ## Features
//!
//! - **Boards**: Kanban-style boards whose items keep a sparse position order,
//!   so most inserts and moves touch a single row
//! - **Planners**: Date-windowed planners with per-day items and optional
//!   links into the lesson library
//! - **Library**: Shared resources and lessons, linked many-to-many
//! - **Community**: Posts, comments, and likes that may target either
//! - **Identity**: Users, OAuth accounts, sessions, and verification tokens
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: ID newtypes, the acting-user context, and listing DTOs
//! - [`db`]: Repository traits, backends, and the service layer
//! - [`models`]: Entity types and their wire-format enums
//! - [`services`]: Backend-independent ordering, policy, and validation rules

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;
