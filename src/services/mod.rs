//! Service layer for backend-independent domain rules.
//!
//! These modules hold the pure pieces every repository implementation shares:
//! the position-allocation algorithm for ordered scopes, the visibility and
//! workflow policy predicates, and the write-time validation checks.

pub mod ordering;
pub mod policy;
pub mod validation;

#[cfg(test)]
mod policy_tests;
