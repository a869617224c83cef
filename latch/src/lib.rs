//! Component identity and per-holder storage.
//!
//! `latch` lets arbitrary holder objects (entities, items, blocks, worlds)
//! carry an open-ended set of typed extension data, contributed by modules
//! that are loaded independently and discovered incrementally. The crate
//! covers identity and storage only; component behavior, holder lifecycle,
//! and transport framing live with the host.
//!
//! The pieces, leaves first:
//!
//! - [`component::Registry`] assigns each globally-unique identifier a dense,
//!   process-stable raw id and is the single source of truth for which
//!   component kinds exist.
//! - [`layout`] compiles, once the set of kinds declared for a holder type is
//!   closed at startup, a specialized storage layout with one direct slot per
//!   kind instead of a generic map.
//! - [`container`] is the generic runtime storage, with dense slot-array and
//!   hash-map strategies behind one contract, and the tolerant-read /
//!   strict-write serialization codec over [`tag`] trees.
//! - [`factory::Feedback`] materializes the container for each new holder
//!   instance and learns, from the shapes it has produced, how to allocate
//!   the next one.
//!
//! Registration is the only shared mutable state and is internally
//! synchronized; layouts are immutable after startup, and containers belong
//! to exactly one holder instance.

pub mod component;
pub mod container;
pub mod error;
pub mod factory;
pub mod layout;
pub mod tag;

pub use component::{Component, Identifier, Kind, RawId, Registry};
pub use container::{Adaptive, Container, KindSet, Strategy};
pub use error::{ConflictError, StartupError, ValidationError};
pub use factory::Feedback;
pub use layout::{Layout, Plan, Producer};
pub use tag::{Compound, Tag};
