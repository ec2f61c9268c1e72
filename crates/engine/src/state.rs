//! Per-call refinement state.

use optiloop_core::{AgentKind, CodeArtifact, StrategyAction, TraceEntry};

/// Best reward before anything has been promoted.
pub const BEST_REWARD_SENTINEL: f64 = -1.0;

/// Mutable state of one optimization call.
///
/// Created after the baseline, updated once per round and dropped when the
/// report is built.
#[derive(Debug, Clone)]
pub struct RefinementState {
    /// Code the next round's generators start from
    pub working: CodeArtifact,

    /// Best code promoted so far
    pub best: CodeArtifact,

    /// Reward of `best`, or the sentinel
    pub best_reward: f64,

    /// Family that produced `best`
    pub best_agent: Option<AgentKind>,

    /// Actions taken this episode, fed to the reward's diversity term
    pub episode_actions: Vec<StrategyAction>,

    /// Rounds completed
    pub round: usize,

    /// One entry per completed round
    pub trace: Vec<TraceEntry>,
}

impl RefinementState {
    /// Fresh state starting from the sanitized input.
    pub fn new(code: CodeArtifact, first_action: StrategyAction) -> Self {
        Self {
            working: code.clone(),
            best: code,
            best_reward: BEST_REWARD_SENTINEL,
            best_agent: None,
            episode_actions: vec![first_action],
            round: 0,
            trace: Vec::new(),
        }
    }

    /// Rewards of earlier rounds that had a winner.
    pub fn previous_rewards(&self) -> Vec<f64> {
        self.trace.iter().filter_map(|entry| entry.reward).collect()
    }

    /// Promote a round winner if it beats the best so far.
    ///
    /// Returns whether the candidate was promoted.
    pub fn offer(&mut self, agent: AgentKind, code: &CodeArtifact, reward: f64) -> bool {
        if reward > self.best_reward {
            self.working = code.clone();
            self.best = code.clone();
            self.best_reward = reward;
            self.best_agent = Some(agent);
            true
        } else {
            false
        }
    }

    /// Whether any round promoted a candidate.
    pub fn improved(&self) -> bool {
        self.best_agent.is_some()
    }

    /// Close a round: record its entry and the policy's next action.
    pub fn finish_round(&mut self, entry: TraceEntry) {
        self.episode_actions.push(entry.diagnostics.argmax);
        self.trace.push(entry);
        self.round += 1;
    }
}
