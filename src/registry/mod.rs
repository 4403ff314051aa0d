// src/registry/mod.rs

//! Directory registry: the fixed queue categories and the units inside them.
//!
//! - [`category`] defines the category table (context, policy, trigger).
//! - [`directory`] enumerates units under a queue root in a stable order.

pub mod category;
pub mod directory;

pub use category::Category;
pub use directory::{DirectoryRegistry, Unit, UnitKind};
