//! Moves the application between registered versions.

use std::fmt;
use std::str::FromStr;

use super::marker::MarkerStore;
use super::profile::{Profile, Profiles};
use crate::StorageError;

/// A migration command by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Refresh,
    Reset,
}

impl FromStr for Action {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Action::Up),
            "down" => Ok(Action::Down),
            "refresh" => Ok(Action::Refresh),
            "reset" => Ok(Action::Reset),
            _ => Err(StorageError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Refresh => "refresh",
            Action::Reset => "reset",
        };
        write!(f, "{}", name)
    }
}

/// Runs registered steps and records progress in a marker store.
///
/// The marker always holds the key of the last step that completed, so a
/// failed run can be resumed from where it stopped.
#[derive(Debug)]
pub struct Migrator<S, M> {
    profiles: Profiles<S>,
    marker: M,
    version: Option<String>,
}

impl<S, M: MarkerStore> Migrator<S, M> {
    pub fn new(profiles: Profiles<S>, marker: M) -> Self {
        Self {
            profiles,
            marker,
            version: None,
        }
    }

    pub fn profiles(&self) -> &Profiles<S> {
        &self.profiles
    }

    pub fn marker(&self) -> &M {
        &self.marker
    }

    /// Key of the last applied step; `""` when nothing is applied.
    ///
    /// The version recorded by this migrator wins over the persisted marker,
    /// which is read only while no version is known.
    pub fn current_version(&mut self) -> Result<String, StorageError> {
        if let Some(version) = self.version.as_ref().filter(|v| !v.is_empty()) {
            return Ok(version.clone());
        }
        self.version = self.marker.read()?;
        Ok(self.version.clone().unwrap_or_default())
    }

    /// The last applied step.
    pub fn current(&mut self) -> Result<Option<&Profile<S>>, StorageError> {
        let version = self.current_version()?;
        self.profiles.profile(&version)
    }

    /// Apply every step after the current one up to and including `target`.
    /// `""` and `"*"` mean the last registered step.
    pub async fn up(&mut self, target: &str) -> Result<(), StorageError> {
        let current = self.current_version()?;
        let from = self.profiles.position_of(&current)?;
        let to = match target {
            "" | "*" => self.profiles.len() as isize - 1,
            key => self.profiles.position_of(key)?,
        };

        for ordinal in (from + 1)..=to {
            let Some(next) = self.profiles.at(ordinal) else {
                break;
            };
            log::info!("Upgrading to {} ...", next.key());
            log::info!("| {}", next.name());
            next.upgrade(&self.profiles).await?;

            self.marker.write(next.key())?;
            self.version = Some(next.key().to_string());
        }

        Ok(())
    }

    /// Revert steps from the current one down to, but not including,
    /// `target`. `""` reverts everything.
    pub async fn down(&mut self, target: &str) -> Result<(), StorageError> {
        let current = self.current_version()?;
        if current == target {
            if current.is_empty() {
                log::info!("Application is uninitialized yet");
            }
            return Ok(());
        }

        let from = self.profiles.position_of(&current)?;
        let to = self.profiles.position_of(target)?;

        let mut ordinal = from;
        while ordinal > to {
            let Some(step) = self.profiles.at(ordinal) else {
                break;
            };
            log::info!("Downgrading from {} ...", step.key());
            log::info!("| {}", step.name());
            step.downgrade(&self.profiles).await?;

            match self.profiles.at(ordinal - 1) {
                Some(previous) => {
                    self.marker.write(previous.key())?;
                    self.version = Some(previous.key().to_string());
                }
                None => {
                    self.marker.clear()?;
                    self.version = None;
                }
            }
            ordinal -= 1;
        }

        Ok(())
    }

    /// Revert everything, then apply up to `target`.
    pub async fn refresh(&mut self, target: &str) -> Result<(), StorageError> {
        log::info!("Refreshing state of application...");
        self.down("").await?;
        self.up(target).await
    }

    /// Revert everything.
    pub async fn reset(&mut self) -> Result<(), StorageError> {
        log::info!("Resetting state of application...");
        self.down("").await
    }

    /// Dispatch an action given by name, ignoring case.
    pub async fn run(&mut self, action: &str, target: &str) -> Result<(), StorageError> {
        match action.parse::<Action>()? {
            Action::Up => self.up(target).await,
            Action::Down => self.down(target).await,
            Action::Refresh => self.refresh(target).await,
            Action::Reset => self.reset().await,
        }
    }

    /// Give back the registry and marker store.
    pub fn into_parts(self) -> (Profiles<S>, M) {
        (self.profiles, self.marker)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::BoxFuture;
    use crate::migrate::MemoryMarker;

    type Journal = Mutex<Vec<String>>;

    fn record<'a>(
        profiles: &'a Profiles<Journal>,
        entry: &'static str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            profiles.state().lock().push(entry.to_string());
            Ok::<_, StorageError>(())
        })
    }

    fn fail(_: &Profiles<Journal>) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async { Err::<(), _>(StorageError::Migration("step b broke".into())) })
    }

    fn steps(break_b: bool) -> Profiles<Journal> {
        let mut profiles = Profiles::new(Journal::default());
        profiles
            .register("a", "first", |p| record(p, "+a"), |p| record(p, "-a"))
            .unwrap();
        if break_b {
            profiles
                .register("b", "second", fail, |p| record(p, "-b"))
                .unwrap();
        } else {
            profiles
                .register("b", "second", |p| record(p, "+b"), |p| record(p, "-b"))
                .unwrap();
        }
        profiles
            .register("c", "third", |p| record(p, "+c"), |p| record(p, "-c"))
            .unwrap();
        profiles
    }

    fn journal<M: MarkerStore>(migrator: &Migrator<Journal, M>) -> Vec<String> {
        migrator.profiles().state().lock().clone()
    }

    #[tokio::test]
    async fn up_applies_every_step_in_order() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::new());

        migrator.up("*").await.unwrap();

        assert_eq!(journal(&migrator), vec!["+a", "+b", "+c"]);
        assert_eq!(migrator.marker().read().unwrap().as_deref(), Some("c"));
        assert_eq!(migrator.current().unwrap().map(Profile::name), Some("third"));
    }

    #[tokio::test]
    async fn up_stops_at_the_first_failure() {
        let mut migrator = Migrator::new(steps(true), MemoryMarker::new());

        let err = migrator.up("").await.unwrap_err();

        assert_eq!(err.to_string(), "Migration error: step b broke");
        assert_eq!(journal(&migrator), vec!["+a"]);
        assert_eq!(migrator.marker().read().unwrap().as_deref(), Some("a"));
        assert_eq!(migrator.current_version().unwrap(), "a");
    }

    #[tokio::test]
    async fn up_resumes_from_the_persisted_marker() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::with_key("a\n"));

        migrator.up("b").await.unwrap();

        assert_eq!(journal(&migrator), vec!["+b"]);
        assert_eq!(migrator.current_version().unwrap(), "b");
    }

    #[tokio::test]
    async fn down_to_nothing_reverts_and_clears_the_marker() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::with_key("c"));

        migrator.down("").await.unwrap();

        assert_eq!(journal(&migrator), vec!["-c", "-b", "-a"]);
        assert_eq!(migrator.marker().read().unwrap(), None);
        assert_eq!(migrator.current_version().unwrap(), "");
    }

    #[tokio::test]
    async fn down_to_a_step_keeps_that_step() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::with_key("c"));

        migrator.down("a").await.unwrap();

        assert_eq!(journal(&migrator), vec!["-c", "-b"]);
        assert_eq!(migrator.marker().read().unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn down_to_the_current_version_is_a_no_op() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::with_key("b"));
        migrator.down("b").await.unwrap();

        let mut fresh = Migrator::new(steps(false), MemoryMarker::new());
        fresh.down("").await.unwrap();

        assert!(journal(&migrator).is_empty());
        assert!(journal(&fresh).is_empty());
    }

    #[tokio::test]
    async fn refresh_reverts_then_reapplies() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::with_key("b"));

        migrator.refresh("c").await.unwrap();

        assert_eq!(journal(&migrator), vec!["-b", "-a", "+a", "+b", "+c"]);
        assert_eq!(migrator.current_version().unwrap(), "c");
    }

    #[tokio::test]
    async fn reset_reverts_everything() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::with_key("b"));

        migrator.reset().await.unwrap();

        assert_eq!(journal(&migrator), vec!["-b", "-a"]);
        assert_eq!(migrator.current().unwrap().map(Profile::key), None);
    }

    #[tokio::test]
    async fn run_dispatches_by_name_ignoring_case() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::new());

        migrator.run("UP", "b").await.unwrap();
        migrator.run("Down", "a").await.unwrap();
        let err = migrator.run("sideways", "").await.unwrap_err();

        assert_eq!(journal(&migrator), vec!["+a", "+b", "-b"]);
        assert!(matches!(err, StorageError::UnknownAction(ref name) if name == "sideways"));
    }

    #[tokio::test]
    async fn unknown_targets_are_rejected() {
        let mut migrator = Migrator::new(steps(false), MemoryMarker::new());

        let err = migrator.up("z").await.unwrap_err();

        assert!(matches!(err, StorageError::UnknownVersion(_)));
        assert!(journal(&migrator).is_empty());
    }

    #[test]
    fn actions_parse_and_display() {
        assert_eq!("ReFrEsH".parse::<Action>().unwrap(), Action::Refresh);
        assert_eq!(Action::Reset.to_string(), "reset");
    }
}
