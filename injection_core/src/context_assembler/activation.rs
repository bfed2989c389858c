//! Activation Gate - probability rolls and the per-turn activation ceiling.

use std::collections::VecDeque;

use rand::rngs::ThreadRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lore_rules::{Rule, RuleId};

use super::budget::injection_order;

/// Source of percentile rolls for probability gating.
pub trait RollSource {
    /// Draw a uniform value in `0..100`.
    fn roll_percent(&mut self) -> u32;
}

/// Rolls drawn from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRoller<R>(pub R);

impl<R: Rng> RollSource for RngRoller<R> {
    fn roll_percent(&mut self) -> u32 {
        self.0.random_range(0..100)
    }
}

impl RngRoller<ThreadRng> {
    /// Rolls from the thread-local generator.
    pub fn thread_local() -> Self {
        Self(rand::rng())
    }
}

/// Replays a fixed sequence of rolls, then repeats a fallback value.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedRolls {
    /// Replay `rolls` in order; afterwards every roll is 0.
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: 0,
        }
    }

    /// Every roll returns `value`.
    pub fn constant(value: u32) -> Self {
        Self::new([]).with_fallback(value)
    }

    /// Set the value returned once the script runs out.
    pub fn with_fallback(mut self, fallback: u32) -> Self {
        self.fallback = fallback;
        self
    }
}

impl RollSource for ScriptedRolls {
    fn roll_percent(&mut self) -> u32 {
        self.rolls.pop_front().unwrap_or(self.fallback)
    }
}

/// Why a matched rule did not activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressionReason {
    /// The probability roll failed.
    Probability,
    /// Activating it would exceed a per-turn activation ceiling.
    ActivationCap,
}

/// Result of gating one turn's candidates.
#[derive(Debug, Clone, Default)]
pub struct GateOutcome<'a> {
    /// Rules cleared for budget allocation: always-active first, then
    /// triggered rules in priority order.
    pub activated: Vec<&'a Rule>,

    /// Matched rules that were held back, with the reason.
    pub suppressed: Vec<(RuleId, SuppressionReason)>,
}

/// Decides which matched rules actually activate this turn.
pub struct ActivationGate;

impl ActivationGate {
    /// Gate a turn's candidates.
    ///
    /// Always-active rules pass unconditionally. Each matched rule draws one
    /// roll, in the order given, and passes iff the roll is below its
    /// probability. Survivors are then trimmed against activation ceilings,
    /// dropping the lowest-priority rules first.
    pub fn apply<'a>(
        always_active: Vec<&'a Rule>,
        matched: Vec<&'a Rule>,
        rolls: &mut dyn RollSource,
    ) -> GateOutcome<'a> {
        let mut outcome = GateOutcome {
            activated: always_active,
            suppressed: Vec::new(),
        };

        // Step 1: Probability rolls
        let mut passed = Vec::with_capacity(matched.len());
        for rule in matched {
            let roll = rolls.roll_percent();
            let chance = u32::try_from(rule.probability.clamp(0, 100)).unwrap_or(0);

            if roll < chance {
                passed.push(rule);
            } else {
                debug!(rule = %rule.id, roll, chance, "probability roll failed");
                outcome.suppressed.push((rule.id, SuppressionReason::Probability));
            }
        }

        // Step 2: Activation ceilings
        outcome
            .activated
            .extend(enforce_activation_caps(passed, &mut outcome.suppressed));

        outcome
    }
}

/// Keep the highest-priority rules such that, for every kept rule with a
/// ceiling, the number of kept triggered rules does not exceed it.
fn enforce_activation_caps<'a>(
    mut passed: Vec<&'a Rule>,
    suppressed: &mut Vec<(RuleId, SuppressionReason)>,
) -> Vec<&'a Rule> {
    passed.sort_by(|a, b| injection_order(a, b));

    if passed.iter().all(|r| r.max_activations_per_turn.is_none()) {
        return passed;
    }

    let mut kept = Vec::with_capacity(passed.len());
    let mut ceiling = usize::MAX;

    for rule in passed {
        let own = rule
            .max_activations_per_turn
            .map_or(usize::MAX, |max| usize::try_from(max).unwrap_or(0));
        let limit = ceiling.min(own);

        if kept.len() < limit {
            ceiling = limit;
            kept.push(rule);
        } else {
            debug!(rule = %rule.id, limit, "activation ceiling reached");
            suppressed.push((rule.id, SuppressionReason::ActivationCap));
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn triggered(title: &str, order: i32) -> Rule {
        Rule::new(title, format!("{title} lore"))
            .with_keywords([title])
            .with_order(order)
    }

    fn titles(rules: &[&Rule]) -> Vec<String> {
        rules.iter().map(|r| r.title.clone()).collect()
    }

    #[test]
    fn test_scripted_rolls() {
        let mut rolls = ScriptedRolls::new([5, 95]).with_fallback(42);
        assert_eq!(rolls.roll_percent(), 5);
        assert_eq!(rolls.roll_percent(), 95);
        assert_eq!(rolls.roll_percent(), 42);
        assert_eq!(ScriptedRolls::constant(99).roll_percent(), 99);
    }

    #[test]
    fn test_rng_roller_in_range() {
        let mut roller = RngRoller(StdRng::seed_from_u64(1));
        for _ in 0..1000 {
            assert!(roller.roll_percent() < 100);
        }
    }

    #[test]
    fn test_probability_threshold_is_strict() {
        let rule = triggered("A", 100).with_probability(30);

        let outcome = ActivationGate::apply(vec![], vec![&rule], &mut ScriptedRolls::constant(29));
        assert_eq!(outcome.activated.len(), 1);

        let outcome = ActivationGate::apply(vec![], vec![&rule], &mut ScriptedRolls::constant(30));
        assert!(outcome.activated.is_empty());
        assert_eq!(outcome.suppressed, vec![(rule.id, SuppressionReason::Probability)]);
    }

    #[test]
    fn test_probability_extremes() {
        let always = triggered("Always", 100).with_probability(100);
        let never = triggered("Never", 100).with_probability(0);

        let outcome = ActivationGate::apply(
            vec![],
            vec![&always, &never],
            &mut ScriptedRolls::new([99, 0]),
        );

        assert_eq!(titles(&outcome.activated), vec!["Always"]);
        assert_eq!(outcome.suppressed, vec![(never.id, SuppressionReason::Probability)]);
    }

    #[test]
    fn test_always_active_bypasses_rolls() {
        let world = Rule::new("World", "The sky is green.")
            .always_active()
            .with_probability(0);

        let outcome = ActivationGate::apply(vec![&world], vec![], &mut ScriptedRolls::constant(99));
        assert_eq!(titles(&outcome.activated), vec!["World"]);
        assert!(outcome.suppressed.is_empty());
    }

    #[test]
    fn test_one_roll_per_matched_rule_in_order() {
        let a = triggered("A", 100).with_probability(50);
        let b = triggered("B", 100).with_probability(50);
        let c = triggered("C", 100).with_probability(50);

        let outcome = ActivationGate::apply(
            vec![],
            vec![&a, &b, &c],
            &mut ScriptedRolls::new([10, 90, 10]),
        );

        assert_eq!(titles(&outcome.activated), vec!["A", "C"]);
        assert_eq!(outcome.suppressed, vec![(b.id, SuppressionReason::Probability)]);
    }

    #[test]
    fn test_cap_drops_lowest_priority() {
        let high = triggered("High", 300).with_max_activations_per_turn(2);
        let mid = triggered("Mid", 200);
        let low = triggered("Low", 100);

        let outcome = ActivationGate::apply(
            vec![],
            vec![&low, &mid, &high],
            &mut ScriptedRolls::constant(0),
        );

        assert_eq!(titles(&outcome.activated), vec!["High", "Mid"]);
        assert_eq!(outcome.suppressed, vec![(low.id, SuppressionReason::ActivationCap)]);
    }

    #[test]
    fn test_cap_uses_token_priority_tiebreak() {
        let a = triggered("A", 100).with_token_priority(50).with_max_activations_per_turn(1);
        let b = triggered("B", 100).with_token_priority(150).with_max_activations_per_turn(1);

        let outcome = ActivationGate::apply(vec![], vec![&a, &b], &mut ScriptedRolls::constant(0));

        assert_eq!(titles(&outcome.activated), vec!["B"]);
    }

    #[test]
    fn test_low_priority_cap_only_limits_itself() {
        let a = triggered("A", 300);
        let b = triggered("B", 200);
        let capped = triggered("Capped", 100).with_max_activations_per_turn(1);

        let outcome = ActivationGate::apply(
            vec![],
            vec![&a, &b, &capped],
            &mut ScriptedRolls::constant(0),
        );

        assert_eq!(titles(&outcome.activated), vec!["A", "B"]);
        assert_eq!(outcome.suppressed, vec![(capped.id, SuppressionReason::ActivationCap)]);
    }

    #[test]
    fn test_cap_ignores_always_active() {
        let world = Rule::new("World", "lore").always_active();
        let a = triggered("A", 200).with_max_activations_per_turn(1);
        let b = triggered("B", 100);

        let outcome = ActivationGate::apply(
            vec![&world],
            vec![&a, &b],
            &mut ScriptedRolls::constant(0),
        );

        assert_eq!(titles(&outcome.activated), vec!["World", "A"]);
    }

    #[test]
    fn test_cap_never_exceeded() {
        let rules: Vec<Rule> = (0..12)
            .map(|i| {
                let rule = triggered(&format!("R{i}"), i * 10);
                if i % 3 == 0 {
                    rule.with_max_activations_per_turn(1 + i / 3)
                } else {
                    rule
                }
            })
            .collect();
        let matched: Vec<&Rule> = rules.iter().collect();

        let outcome = ActivationGate::apply(vec![], matched, &mut ScriptedRolls::constant(0));

        let count = outcome.activated.len();
        for rule in &outcome.activated {
            if let Some(max) = rule.max_activations_per_turn {
                assert!(count <= max as usize, "{} allows {max}, got {count}", rule.title);
            }
        }
        assert_eq!(count + outcome.suppressed.len(), rules.len());
    }

    #[test]
    fn test_probability_rate_converges() {
        let rule = triggered("A", 100).with_probability(30);
        let mut roller = RngRoller(StdRng::seed_from_u64(0x5eed));
        let trials = 10_000;

        let activated = (0..trials)
            .filter(|_| {
                !ActivationGate::apply(vec![], vec![&rule], &mut roller)
                    .activated
                    .is_empty()
            })
            .count();

        let rate = activated as f64 / trials as f64;
        assert!((rate - 0.30).abs() < 0.02, "observed rate {rate}");
    }
}
