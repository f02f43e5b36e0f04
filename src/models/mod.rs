//! Domain model module declarations.

pub mod person;
