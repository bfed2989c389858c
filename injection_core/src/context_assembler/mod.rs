//! Context Assembler - picks the rules injected into one turn's narration
//! context.
//!
//! Each turn runs the same pipeline over an immutable rule snapshot:
//! 1. **Filter**: Skip inactive rules and rules that fail validation
//! 2. **Evaluate**: Match triggered rules against their scan windows
//! 3. **Gate**: Roll probabilities and apply activation ceilings
//! 4. **Allocate**: Fill the token budget greedily in priority order
//! 5. **Assemble**: Join the chosen contents into one injection block
//!
//! No rule's decision depends on another's, except through the shared budget,
//! which is settled purely by the allocation order.

mod activation;
mod budget;

pub use activation::*;
pub use budget::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use lore_rules::{Rule, RuleId, RuleSnapshot};

use crate::config::EngineConfig;
use crate::scan::{ScanSources, ScanWindow};
use crate::trigger::TriggerEvaluator;

/// Where a rule ended up in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTurnState {
    /// Keywords did not fire.
    Unmatched,
    /// Matched, but held back by the activation gate.
    Suppressed(SuppressionReason),
    /// Activated, but did not fit in the remaining budget.
    DroppedForBudget,
    /// Injected this turn.
    Included,
}

/// A rule's final state for the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTrace {
    pub rule_id: RuleId,
    pub state: RuleTurnState,
}

/// A rule that was excluded because it failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRule {
    pub rule_id: RuleId,
    pub errors: Vec<String>,
}

/// One piece of content chosen for injection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedEntry {
    pub rule_id: RuleId,
    pub title: String,
    pub content: String,
    pub token_weight: u32,
    pub always_active: bool,
}

/// The outcome of one turn: what to inject, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPlan {
    /// Turn this plan was computed for.
    pub turn: u64,

    /// Store version of the evaluated snapshot.
    pub snapshot_version: u64,

    /// Entries in injection order.
    pub entries: Vec<InjectedEntry>,

    pub used_tokens: u32,
    pub token_budget: u32,

    /// Final state of every evaluated rule, in snapshot order.
    pub trace: Vec<RuleTrace>,

    /// Active rules skipped because they failed validation.
    pub invalid: Vec<InvalidRule>,
}

impl InjectionPlan {
    /// Budget left unused this turn.
    pub fn remaining_budget(&self) -> u32 {
        self.token_budget.saturating_sub(self.used_tokens)
    }

    /// IDs of the injected rules, in injection order.
    ///
    /// Pass these to `RuleStore::record_activations` to persist bookkeeping.
    pub fn included_ids(&self) -> Vec<RuleId> {
        self.entries.iter().map(|e| e.rule_id).collect()
    }

    /// Whether nothing is injected this turn.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Final state of a rule, if it was evaluated this turn.
    pub fn state_of(&self, id: RuleId) -> Option<RuleTurnState> {
        self.trace.iter().find(|t| t.rule_id == id).map(|t| t.state)
    }

    /// Join the injected contents with `separator`, under an optional header.
    ///
    /// Returns an empty string when nothing is injected.
    pub fn to_injection_block(&self, separator: &str, header: Option<&str>) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let body = self
            .entries
            .iter()
            .map(|e| e.content.as_str())
            .collect::<Vec<_>>()
            .join(separator);

        match header {
            Some(header) => format!("{header}\n{body}"),
            None => body,
        }
    }
}

/// Runs the per-turn injection pipeline.
pub struct InjectionEngine {
    config: EngineConfig,
    evaluator: TriggerEvaluator,
}

impl InjectionEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let evaluator = TriggerEvaluator::new(config.secondary_keywords);
        Self { config, evaluator }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide what to inject for one turn.
    ///
    /// The snapshot is only read; activation bookkeeping is reported through
    /// [`InjectionPlan::included_ids`] for the caller to persist.
    pub fn run_turn(
        &self,
        snapshot: &RuleSnapshot,
        sources: &ScanSources,
        turn: u64,
        rolls: &mut dyn RollSource,
    ) -> InjectionPlan {
        let mut states: HashMap<RuleId, RuleTurnState> = HashMap::new();
        let mut invalid = Vec::new();
        let mut always_active = Vec::new();
        let mut matched = Vec::new();
        let mut scan_texts: HashMap<ScanWindow, String> = HashMap::new();

        // Step 1 + 2: Filter and evaluate
        for rule in snapshot.iter().filter(|r| r.is_active) {
            let errors = rule.validation_errors();
            if !errors.is_empty() {
                warn!(rule = %rule.id, ?errors, "skipping invalid rule");
                invalid.push(InvalidRule {
                    rule_id: rule.id,
                    errors,
                });
                continue;
            }

            if rule.always_active {
                always_active.push(rule);
                continue;
            }

            let window = ScanWindow::for_rule(rule);
            let text = scan_texts
                .entry(window)
                .or_insert_with(|| sources.scan_text(&window));

            if self.evaluator.evaluate(rule, text) {
                matched.push(rule);
            } else {
                states.insert(rule.id, RuleTurnState::Unmatched);
            }
        }

        // Step 3: Gate
        let gate = ActivationGate::apply(always_active, matched, rolls);
        for (id, reason) in &gate.suppressed {
            states.insert(*id, RuleTurnState::Suppressed(*reason));
        }

        // Step 4: Allocate
        let allocation = allocate(gate.activated, self.config.token_budget);
        for id in &allocation.dropped {
            states.insert(*id, RuleTurnState::DroppedForBudget);
        }
        for rule in &allocation.included {
            states.insert(rule.id, RuleTurnState::Included);
        }

        let trace = snapshot
            .iter()
            .filter_map(|rule| {
                states.get(&rule.id).map(|state| RuleTrace {
                    rule_id: rule.id,
                    state: *state,
                })
            })
            .collect();

        let plan = InjectionPlan {
            turn,
            snapshot_version: snapshot.version(),
            entries: allocation.included.iter().map(|r| entry_for(r)).collect(),
            used_tokens: allocation.used,
            token_budget: allocation.budget,
            trace,
            invalid,
        };

        info!(
            turn,
            included = plan.entries.len(),
            used = plan.used_tokens,
            budget = plan.token_budget,
            "injection plan assembled"
        );
        plan
    }

    /// Render a plan with this engine's separator and header.
    pub fn assemble(&self, plan: &InjectionPlan) -> String {
        plan.to_injection_block(&self.config.separator, self.config.header.as_deref())
    }
}

fn entry_for(rule: &Rule) -> InjectedEntry {
    InjectedEntry {
        rule_id: rule.id,
        title: rule.title.clone(),
        content: rule.content.clone(),
        token_weight: rule.token_weight,
        always_active: rule.always_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_rules::{RuleStore, TriggerLogic};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::SecondaryKeywordMode;

    struct Scenario {
        a: Rule,
        b: Rule,
        c: Rule,
    }

    /// A is always active, B and C trigger on words both present in the scan.
    fn scenario() -> Scenario {
        Scenario {
            a: Rule::new("Luật", "Thế giới này có phép thuật.")
                .always_active()
                .with_token_weight(50),
            b: Rule::new("Rồng", "Rồng phun lửa.")
                .with_keywords(["rồng"])
                .with_order(200)
                .with_token_weight(80),
            c: Rule::new("Kiếm", "Kiếm thần nằm trong hang.")
                .with_keywords(["kiếm"])
                .with_order(100)
                .with_token_weight(80),
        }
    }

    fn snapshot_of(s: &Scenario) -> RuleSnapshot {
        RuleSnapshot::from_rules(vec![s.c.clone(), s.b.clone(), s.a.clone()])
    }

    fn sources() -> ScanSources {
        ScanSources::new("Tôi rút kiếm và lao về phía con rồng")
    }

    fn run(budget: u32, snapshot: &RuleSnapshot, sources: &ScanSources) -> InjectionPlan {
        InjectionEngine::new(EngineConfig::with_budget(budget)).run_turn(
            snapshot,
            sources,
            1,
            &mut ScriptedRolls::constant(0),
        )
    }

    fn titles(plan: &InjectionPlan) -> Vec<String> {
        plan.entries.iter().map(|e| e.title.clone()).collect()
    }

    #[test]
    fn test_scenario_budget_150() {
        let s = scenario();
        let plan = run(150, &snapshot_of(&s), &sources());

        assert_eq!(titles(&plan), vec!["Luật", "Rồng"]);
        assert_eq!(plan.used_tokens, 130);
        assert_eq!(plan.remaining_budget(), 20);
        assert_eq!(plan.state_of(s.c.id), Some(RuleTurnState::DroppedForBudget));
    }

    #[test]
    fn test_scenario_budget_60() {
        let s = scenario();
        let plan = run(60, &snapshot_of(&s), &sources());

        assert_eq!(titles(&plan), vec!["Luật"]);
        assert_eq!(plan.used_tokens, 50);
        assert_eq!(plan.state_of(s.b.id), Some(RuleTurnState::DroppedForBudget));
        assert_eq!(plan.state_of(s.c.id), Some(RuleTurnState::DroppedForBudget));
    }

    #[test]
    fn test_included_count_grows_with_budget() {
        let s = scenario();
        let snapshot = snapshot_of(&s);
        let sources = sources();

        let mut previous = 0;
        for budget in 0..=300 {
            let plan = run(budget, &snapshot, &sources);
            assert!(plan.used_tokens <= budget);
            assert!(plan.entries.len() >= previous, "shrank at budget {budget}");
            previous = plan.entries.len();
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn test_not_any_fires_when_word_absent() {
        let rule = Rule::new("Hòa bình", "Không có gì bị cấm ở đây.")
            .with_keywords(["cấm"])
            .with_logic(TriggerLogic::NotAny);
        let snapshot = RuleSnapshot::from_rules(vec![rule.clone()]);

        let plan = run(1000, &snapshot, &ScanSources::new("một ngày yên bình"));
        assert_eq!(plan.state_of(rule.id), Some(RuleTurnState::Included));

        let plan = run(1000, &snapshot, &ScanSources::new("vào vùng đất cấm"));
        assert_eq!(plan.state_of(rule.id), Some(RuleTurnState::Unmatched));
    }

    #[test]
    fn test_always_active_ignores_probability_and_text() {
        let world = Rule::new("World", "Magic is fading.")
            .always_active()
            .with_probability(0);
        let snapshot = RuleSnapshot::from_rules(vec![world.clone()]);

        let plan = InjectionEngine::with_defaults().run_turn(
            &snapshot,
            &ScanSources::default(),
            1,
            &mut ScriptedRolls::constant(99),
        );

        assert_eq!(plan.included_ids(), vec![world.id]);
    }

    #[test]
    fn test_inactive_rules_invisible() {
        let rule = Rule::new("Dormant", "text")
            .with_keywords(["dragon"])
            .with_active(false);
        let broken = Rule::new("Broken", "").with_active(false);
        let snapshot = RuleSnapshot::from_rules(vec![rule.clone(), broken]);

        let plan = run(1000, &snapshot, &ScanSources::new("dragon"));

        assert!(plan.is_empty());
        assert!(plan.trace.is_empty());
        assert!(plan.invalid.is_empty());
    }

    #[test]
    fn test_invalid_rules_reported_and_skipped() {
        let broken = Rule::new("Broken", "text")
            .with_keywords(["dragon"])
            .with_probability(250);
        let good = Rule::new("Good", "text").with_keywords(["dragon"]);
        let snapshot = RuleSnapshot::from_rules(vec![broken.clone(), good.clone()]);

        let plan = run(1000, &snapshot, &ScanSources::new("dragon"));

        assert_eq!(plan.included_ids(), vec![good.id]);
        assert_eq!(plan.invalid.len(), 1);
        assert_eq!(plan.invalid[0].rule_id, broken.id);
        assert!(plan.invalid[0].errors[0].contains("probability"));
        assert_eq!(plan.state_of(broken.id), None);
    }

    #[test]
    fn test_trace_covers_every_outcome() {
        let unmatched = Rule::new("Unmatched", "x").with_keywords(["ghost"]);
        let suppressed = Rule::new("Suppressed", "x")
            .with_keywords(["dragon"])
            .with_probability(0);
        let dropped = Rule::new("Dropped", "x")
            .with_keywords(["dragon"])
            .with_token_weight(500);
        let included = Rule::new("Included", "x").with_keywords(["dragon"]);
        let snapshot = RuleSnapshot::from_rules(vec![
            unmatched.clone(),
            suppressed.clone(),
            dropped.clone(),
            included.clone(),
        ]);

        let plan = run(100, &snapshot, &ScanSources::new("a dragon"));

        let states: Vec<_> = plan.trace.iter().map(|t| t.state).collect();
        assert_eq!(
            states,
            vec![
                RuleTurnState::Unmatched,
                RuleTurnState::Suppressed(SuppressionReason::Probability),
                RuleTurnState::DroppedForBudget,
                RuleTurnState::Included,
            ]
        );
    }

    #[test]
    fn test_scan_window_per_rule() {
        let memory_rule = Rule::new("Memory", "x")
            .with_keywords(["oath"])
            .with_scan_sources(false, false, true)
            .with_scan_depth(1);
        let deep_rule = Rule::new("Deep", "x")
            .with_keywords(["oath"])
            .with_scan_sources(false, false, true)
            .with_scan_depth(2);
        let snapshot = RuleSnapshot::from_rules(vec![memory_rule.clone(), deep_rule.clone()]);

        let sources = ScanSources::new("oath")
            .with_memories(["you swore an oath", "you ate bread"]);
        let plan = run(1000, &snapshot, &sources);

        assert_eq!(plan.state_of(memory_rule.id), Some(RuleTurnState::Unmatched));
        assert_eq!(plan.state_of(deep_rule.id), Some(RuleTurnState::Included));
    }

    #[test]
    fn test_secondary_keywords_mode() {
        let rule = Rule::new("Lore", "x")
            .with_keywords(["dragon"])
            .with_secondary_keywords(["cave"]);
        let snapshot = RuleSnapshot::from_rules(vec![rule.clone()]);
        let sources = ScanSources::new("a dragon flies");

        let plan = run(1000, &snapshot, &sources);
        assert_eq!(plan.state_of(rule.id), Some(RuleTurnState::Included));

        let config = EngineConfig {
            secondary_keywords: SecondaryKeywordMode::RequireAny,
            ..EngineConfig::default()
        };
        let plan = InjectionEngine::new(config).run_turn(
            &snapshot,
            &sources,
            1,
            &mut ScriptedRolls::constant(0),
        );
        assert_eq!(plan.state_of(rule.id), Some(RuleTurnState::Unmatched));
    }

    #[test]
    fn test_same_inputs_same_plan() {
        let s = scenario();
        let snapshot = snapshot_of(&s);
        let engine = InjectionEngine::new(EngineConfig::with_budget(150));

        let first = engine.run_turn(&snapshot, &sources(), 4, &mut RngRoller(StdRng::seed_from_u64(9)));
        let second = engine.run_turn(&snapshot, &sources(), 4, &mut RngRoller(StdRng::seed_from_u64(9)));

        assert_eq!(first, second);
    }

    #[test]
    fn test_assemble_block() {
        let s = scenario();
        let config = EngineConfig {
            token_budget: 150,
            separator: "\n---\n".to_string(),
            header: Some("[World notes]".to_string()),
            ..EngineConfig::default()
        };
        let engine = InjectionEngine::new(config);
        let plan = engine.run_turn(&snapshot_of(&s), &sources(), 1, &mut ScriptedRolls::constant(0));

        assert_eq!(
            engine.assemble(&plan),
            "[World notes]\nThế giới này có phép thuật.\n---\nRồng phun lửa."
        );
    }

    #[test]
    fn test_empty_plan_renders_nothing() {
        let engine = InjectionEngine::with_defaults();
        let plan = engine.run_turn(
            &RuleSnapshot::default(),
            &sources(),
            1,
            &mut ScriptedRolls::constant(0),
        );
        assert!(plan.is_empty());
        assert_eq!(engine.assemble(&plan), "");
        assert_eq!(plan.remaining_budget(), 2048);
    }

    #[test]
    fn test_store_round_trip_bookkeeping() {
        let mut store = RuleStore::new();
        let dragon = store
            .add(Rule::new("Dragon", "Dragons hoard gold.").with_keywords(["dragon"]))
            .unwrap();
        let sword = store
            .add(Rule::new("Sword", "The sword is cursed.").with_keywords(["sword"]))
            .unwrap();

        let engine = InjectionEngine::with_defaults();
        let snapshot = store.snapshot();

        // An edit made while the turn is in flight is not visible to it
        store.set_active(dragon, false).unwrap();

        let plan = engine.run_turn(
            &snapshot,
            &ScanSources::new("the dragon wakes"),
            7,
            &mut ScriptedRolls::constant(0),
        );
        assert_eq!(plan.included_ids(), vec![dragon]);

        store.record_activations(&plan.included_ids(), plan.turn);

        let rule = store.get(dragon).unwrap();
        assert_eq!(rule.activation_count, 1);
        assert_eq!(rule.last_activated, Some(7));
        assert_eq!(store.get(sword).unwrap().activation_count, 0);
    }
}
