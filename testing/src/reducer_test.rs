//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.
//! Several actions can be queued; state assertions run against the final
//! state and effect assertions against the effects of the last action.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use loadstate_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```
/// use loadstate_core::{GateAction, GateEnvironment, ReceiveState, RenderGate, RenderGateReducer};
/// use loadstate_testing::{ReducerTest, assertions};
/// use std::time::Duration;
///
/// let env = GateEnvironment::new(Some(Duration::from_millis(200)));
///
/// ReducerTest::new(RenderGateReducer)
///     .given_state(RenderGate::new(&env))
///     .with_env(env)
///     .when_action(GateAction::DominantStateChanged(ReceiveState::Pending))
///     .then_state(|gate| assert!(gate.is_timer_armed()))
///     .then_effects(|effects| assertions::assert_has_delay_effect(effects))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When); may be called repeatedly
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Queue several actions in order
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the final state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, an action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use loadstate_core::effect::Effect;
    use std::time::Duration;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one `Delay` effect
    ///
    /// # Panics
    ///
    /// Panics if no `Delay` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Delay { .. })),
            "Expected at least one Delay effect, but none found"
        );
    }

    /// Assert that the first `Delay` effect waits exactly `expected`
    ///
    /// # Panics
    ///
    /// Panics if no `Delay` effect is found or its duration differs.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_delay_duration<A>(effects: &[Effect<A>], expected: Duration) {
        let delay = effects.iter().find_map(|e| match e {
            Effect::Delay { duration, .. } => Some(*duration),
            _ => None,
        });
        assert_eq!(delay, Some(expected), "Unexpected Delay effect duration");
    }

    /// Assert that effects contain at least one `Cancel` effect
    ///
    /// # Panics
    ///
    /// Panics if no `Cancel` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_cancel_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Cancel)),
            "Expected at least one Cancel effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadstate_core::{GateAction, GateEnvironment, ReceiveState, RenderGate, RenderGateReducer};
    use std::time::Duration;

    const THRESHOLD: Duration = Duration::from_millis(200);

    fn gated() -> GateEnvironment {
        GateEnvironment::new(Some(THRESHOLD))
    }

    #[test]
    fn test_pending_arms_timer() {
        ReducerTest::new(RenderGateReducer)
            .with_env(gated())
            .given_state(RenderGate::new(&gated()))
            .when_action(GateAction::DominantStateChanged(ReceiveState::Pending))
            .then_state(|gate| {
                assert!(!gate.is_open());
                assert!(gate.is_timer_armed());
            })
            .then_effects(|effects| {
                assertions::assert_delay_duration(effects, THRESHOLD);
            })
            .run();
    }

    #[test]
    fn test_received_cancels_armed_timer() {
        ReducerTest::new(RenderGateReducer)
            .with_env(gated())
            .given_state(RenderGate::new(&gated()))
            .when_actions([
                GateAction::DominantStateChanged(ReceiveState::Pending),
                GateAction::DominantStateChanged(ReceiveState::Received),
            ])
            .then_state(|gate| {
                assert!(gate.is_open());
                assert!(!gate.is_timer_armed());
            })
            .then_effects(|effects| {
                assertions::assert_has_cancel_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_repeated_state_has_no_effects() {
        ReducerTest::new(RenderGateReducer)
            .with_env(GateEnvironment::default())
            .given_state(RenderGate::new(&GateEnvironment::default()))
            .when_actions([
                GateAction::DominantStateChanged(ReceiveState::Failed),
                GateAction::DominantStateChanged(ReceiveState::Failed),
            ])
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }
}
