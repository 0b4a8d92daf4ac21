//! File binding for profline profiles.
//!
//! A [`ProfileStore`] owns one profile and the file behind it: where the file
//! lives, an exclusive cross-process lock on it, whether it gets created on
//! first run, and when saves happen. Three sources feed the live profile:
//!
//! 1. defaults registered through GetAdd before [`ProfileStore::open`],
//! 2. the backing file (either codec, with fallback),
//! 3. command-line overrides, merged last and kept out of the saved file.
//!
//! Reserved option keys are listed in [`reserved`].

pub mod atomic;
pub mod error;
pub mod filter;
pub mod location;
pub mod lock;
pub mod options;
pub mod reserved;
pub mod store;

pub use error::{PersistError, PersistResult};
pub use lock::FileLock;
pub use options::{CreatePolicy, CreatePrompt, StoreOptions};
pub use store::{OpenOutcome, ProfileStore};
