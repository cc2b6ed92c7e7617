//! `durian-core`: domain foundation building blocks.
//!
//! Identifiers, the domain error model and the decimal quantities shared by
//! the inventory and sales crates. No infrastructure concerns live here.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{LotId, SaleId, SpeciesId, VariationId};
pub use value_object::{Kilograms, PricePerKg, MAX_PRICE_PER_KG, MAX_WEIGHT_KG};
