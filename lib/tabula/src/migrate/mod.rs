//! Reversible, ordered migration steps.
//!
//! Steps are registered on a [`Profiles`] registry in the order they apply.
//! A [`Migrator`] walks that order forwards or backwards and records the key
//! of the last completed step through a [`MarkerStore`], so an interrupted
//! run resumes where it stopped.

mod marker;
mod profile;
mod runner;

pub use marker::{DEFAULT_MARKER_PATH, FileMarker, MarkerStore, MemoryMarker};
pub use profile::{Callback, Profile, Profiles};
pub use runner::{Action, Migrator};
