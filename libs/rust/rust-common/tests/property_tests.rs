//! Property-based tests for rust-common crate.
//!
//! These tests verify universal properties across all inputs using proptest.

use std::time::Duration;

use proptest::prelude::*;
use rust_common::{FailureClass, RetryConfig, RetryDecision, RetryPolicy, Retryable};

#[derive(Debug)]
struct Outcome {
    retryable: bool,
}

impl Retryable for Outcome {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

// Property: Bounded Retry
// *For any* budget of N attempts, exactly N consecutive retryable failures
// are accepted; the N-th one exhausts the budget and no earlier one does.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_budget_allows_exactly_max_attempts(
        max_attempts in 1u32..20,
        delay_ms in 0u64..10_000,
    ) {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_max_attempts(max_attempts)
                .with_delay(Duration::from_millis(delay_ms)),
        );
        let mut budget = policy.budget();
        let error = Outcome { retryable: true };

        for attempt in 1..max_attempts {
            let decision = budget.record_failure(&error);
            prop_assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_millis(delay_ms)));
            prop_assert_eq!(budget.attempts_remaining(), max_attempts - attempt);
        }

        prop_assert_eq!(budget.record_failure(&error), RetryDecision::Exhausted);
        prop_assert_eq!(budget.attempts_made(), max_attempts);
    }

    #[test]
    fn prop_permanent_error_never_retries(
        max_attempts in 1u32..20,
        transient_before in 0u32..5,
    ) {
        let mut budget = RetryPolicy::new(
            RetryConfig::default().with_max_attempts(max_attempts + transient_before),
        )
        .budget();

        for _ in 0..transient_before {
            let _ = budget.record_failure(&Outcome { retryable: true });
        }
        let remaining = budget.attempts_remaining();

        prop_assert_eq!(budget.record_failure(&Outcome { retryable: false }), RetryDecision::Fatal);
        prop_assert_eq!(budget.attempts_remaining(), remaining);
    }

    #[test]
    fn prop_failure_class_matches_retryability(retryable in any::<bool>()) {
        let class = FailureClass::of(&Outcome { retryable });
        prop_assert_eq!(class == FailureClass::Transient, retryable);
    }
}
