//! Core of the profline configuration store.
//!
//! A profile is an ordered, duplicate-tolerant list of key/value entries
//! that every other component reads and writes through. Keys are looked up
//! through a small pattern language (literal, wildcard, or regex), values
//! are plain text interpreted at read time, and the whole profile has a
//! canonical command-line text form.
//!
//! # Key Types
//!
//! - [`Profile`] -- the entry store, with GetAdd and typed accessors
//! - [`Entry`] / [`Value`] -- a key/value pair and its deferred-typed value
//! - [`KeyPattern`] -- compiled lookup key
//! - [`LoadAction`] / [`LoadReport`] -- Append, Merge, Overwrite reconciliation
//!
//! # Line Format
//!
//! ```text
//! -Name="Alice Smith"
//! -Retries=3
//! -Verbose=True
//! -Notes=[
//! first line
//! second line
//! -Notes=]
//! ```

pub mod entry;
pub mod error;
pub mod line;
pub mod pattern;
pub mod profile;
pub mod reconcile;
pub mod value;

pub use entry::Entry;
pub use error::{ProfileError, ProfileResult};
pub use pattern::{KeyPattern, WILDCARD};
pub use profile::Profile;
pub use reconcile::{LoadAction, LoadReport};
pub use value::{FromValue, Value};
