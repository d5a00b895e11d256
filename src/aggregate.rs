//! Aggregate trait: the decide/apply contract behind every store mutation.

use serde::{Serialize, de::DeserializeOwned};

/// A piece of state that changes only by folding its own domain events.
///
/// The implementing type itself is the state. A mutation is split in two:
/// [`handle`](Aggregate::handle) decides which events a command produces,
/// and [`apply`](Aggregate::apply) folds each event into the next state.
/// Nothing is committed until the caller has folded and persisted the result.
///
/// # Contract
///
/// - [`handle`](Aggregate::handle) must be pure: no I/O, no side effects.
///   Returning `Ok(vec![])` means the command is a no-op.
/// - [`apply`](Aggregate::apply) must be pure and total.
/// - Any state reachable by folding events from [`Default`] must pass
///   [`validate`](Aggregate::validate).
pub trait Aggregate:
    Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The set of commands this aggregate can handle.
    type Command: Send + 'static;

    /// The set of events this aggregate can produce and apply.
    type DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone + 'static;

    /// Command rejection / validation error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Validate a command against the current state and produce events.
    fn handle(&self, cmd: Self::Command) -> Result<Vec<Self::DomainEvent>, Self::Error>;

    /// Apply a single event to produce the next state.
    fn apply(self, event: &Self::DomainEvent) -> Self;

    /// Check the state's invariants.
    ///
    /// Used on state that did not come from folding events, such as a
    /// snapshot read back from storage. The default accepts everything.
    fn validate(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Fold a batch of events into the state, in order.
    fn fold<'a, I>(self, events: I) -> Self
    where
        I: IntoIterator<Item = &'a Self::DomainEvent>,
    {
        events.into_iter().fold(self, |state, event| state.apply(event))
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::Aggregate;
    use serde::{Deserialize, Serialize};

    /// Bounded tally used to exercise the trait without the cart domain.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub(crate) struct Tally {
        pub value: u32,
    }

    pub(crate) const TALLY_LIMIT: u32 = 10;

    pub(crate) enum TallyCommand {
        Bump,
        Reset,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    pub(crate) enum TallyEvent {
        Bumped,
        WasReset { previous: u32 },
    }

    #[derive(Debug, thiserror::Error)]
    pub(crate) enum TallyError {
        #[error("tally is full")]
        Full,
        #[error("tally exceeds limit: {0}")]
        OverLimit(u32),
    }

    impl Aggregate for Tally {
        type Command = TallyCommand;
        type DomainEvent = TallyEvent;
        type Error = TallyError;

        fn handle(&self, cmd: Self::Command) -> Result<Vec<Self::DomainEvent>, Self::Error> {
            match cmd {
                TallyCommand::Bump if self.value >= TALLY_LIMIT => Err(TallyError::Full),
                TallyCommand::Bump => Ok(vec![TallyEvent::Bumped]),
                TallyCommand::Reset if self.value == 0 => Ok(vec![]),
                TallyCommand::Reset => Ok(vec![TallyEvent::WasReset {
                    previous: self.value,
                }]),
            }
        }

        fn apply(mut self, event: &Self::DomainEvent) -> Self {
            match event {
                TallyEvent::Bumped => self.value += 1,
                TallyEvent::WasReset { .. } => self.value = 0,
            }
            self
        }

        fn validate(&self) -> Result<(), Self::Error> {
            if self.value > TALLY_LIMIT {
                return Err(TallyError::OverLimit(self.value));
            }
            Ok(())
        }
    }
}
