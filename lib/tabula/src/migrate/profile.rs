//! Ordered registry of migration steps.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

use crate::{BoxFuture, StorageError};

/// An upgrade or downgrade action. Receives the registry, so steps can reach
/// the shared state and scratch data.
pub type Callback<S> = Box<
    dyn for<'a> Fn(&'a Profiles<S>) -> BoxFuture<'a, Result<(), StorageError>> + Send + Sync,
>;

/// One migration step.
pub struct Profile<S> {
    key: String,
    name: String,
    upgrade: Callback<S>,
    downgrade: Callback<S>,
}

impl<S> Profile<S> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn upgrade<'a>(
        &self,
        profiles: &'a Profiles<S>,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        (self.upgrade)(profiles)
    }

    pub(crate) fn downgrade<'a>(
        &self,
        profiles: &'a Profiles<S>,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        (self.downgrade)(profiles)
    }
}

impl<S> fmt::Debug for Profile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Steps in registration order, plus the state every callback is given.
///
/// A step's ordinal is its registration position and never changes. The
/// ordinal `-1` stands for "nothing applied yet" and is spelled `""`.
pub struct Profiles<S> {
    state: S,
    slice: Vec<Profile<S>>,
    index: HashMap<String, usize>,
    data: Mutex<HashMap<String, serde_json::Value>>,
}

impl<S> Profiles<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            slice: Vec::new(),
            index: HashMap::new(),
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Append a step. Keys are unique; registering one twice is rejected.
    pub fn register<U, D>(
        &mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        upgrade: U,
        downgrade: D,
    ) -> Result<&Profile<S>, StorageError>
    where
        U: for<'a> Fn(&'a Profiles<S>) -> BoxFuture<'a, Result<(), StorageError>>
            + Send
            + Sync
            + 'static,
        D: for<'a> Fn(&'a Profiles<S>) -> BoxFuture<'a, Result<(), StorageError>>
            + Send
            + Sync
            + 'static,
    {
        let key = key.into();
        if self.index.contains_key(&key) {
            return Err(StorageError::DuplicateVersion(key));
        }

        let ordinal = self.slice.len();
        self.index.insert(key.clone(), ordinal);
        self.slice.push(Profile {
            key,
            name: name.into(),
            upgrade: Box::new(upgrade),
            downgrade: Box::new(downgrade),
        });
        Ok(&self.slice[ordinal])
    }

    /// Ordinal of `key`; `""` is `-1`.
    pub fn position_of(&self, key: &str) -> Result<isize, StorageError> {
        if key.is_empty() {
            return Ok(-1);
        }
        self.index
            .get(key)
            .map(|&ordinal| ordinal as isize)
            .ok_or_else(|| StorageError::UnknownVersion(key.to_string()))
    }

    /// The step registered under `key`; `None` for `""`.
    pub fn profile(&self, key: &str) -> Result<Option<&Profile<S>>, StorageError> {
        if key.is_empty() {
            return Ok(None);
        }
        let ordinal = self.position_of(key)?;
        Ok(self.slice.get(ordinal as usize))
    }

    pub(crate) fn at(&self, ordinal: isize) -> Option<&Profile<S>> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|ordinal| self.slice.get(ordinal))
    }

    pub fn len(&self) -> usize {
        self.slice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile<S>> {
        self.slice.iter()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Store a scratch value shared between steps.
    pub fn set(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> &Self {
        self.data.lock().insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.lock().get(key).cloned()
    }
}

impl<S: fmt::Debug> fmt::Debug for Profiles<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiles")
            .field("state", &self.state)
            .field("slice", &self.slice)
            .finish_non_exhaustive()
    }
}
