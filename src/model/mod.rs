//! # Binding Model
//!
//! Clean DTOs that define a binding between two entities.
//! These types cross every boundary: storage ↔ criteria ↔ execution ↔ user.
//!
//! Design rule: no backend types here.
//! This module is pure data with no I/O or async.

pub mod binding;
pub mod entity;
pub mod metadata;
pub mod value;

pub use binding::{Binding, BindingId};
pub use entity::{Entity, EntityRef};
pub use metadata::{meta, Metadata};
pub use value::Value;
