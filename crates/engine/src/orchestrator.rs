//! The refinement orchestrator.

use crate::config::EngineConfig;
use crate::overrides::{apply_overrides, Decision};
use crate::state::RefinementState;
use crate::Result;
use futures::future::join_all;
use optiloop_agents::{CandidateGenerator, Critic};
use optiloop_core::{
    improvement_pct, AgentKind, BenchmarkResult, CodeArtifact, CriticScore, ObjectiveWeights,
    OptimizationReport, OptimizationRequest, OptimizeError, ReportMetrics, RewardResult, RunId,
    TraceEntry,
};
use optiloop_encoder::encode;
use optiloop_policy::PolicyAdapter;
use optiloop_reward::{RewardEngine, RewardInputs};
use optiloop_sandbox::{Sandbox, Sanitizer};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A candidate that survived sanitizing and benchmarking.
struct Scored {
    agent: AgentKind,
    code: CodeArtifact,
    bench: BenchmarkResult,
    result: RewardResult,
}

/// Baseline metrics of the sanitized input.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    runtime: f64,
    memory: f64,
}

/// Runs optimization calls against injected policy, sandbox, generators
/// and critic.
pub struct Orchestrator {
    policy: PolicyAdapter,
    sandbox: Arc<dyn Sandbox>,
    generators: Vec<Arc<dyn CandidateGenerator>>,
    critic: Arc<dyn Critic>,
    sanitizer: Sanitizer,
    reward: RewardEngine,
    config: EngineConfig,
}

impl Orchestrator {
    /// Create an orchestrator with default configuration and no generators.
    pub fn new(policy: PolicyAdapter, sandbox: Arc<dyn Sandbox>, critic: Arc<dyn Critic>) -> Self {
        let config = EngineConfig::default();
        Self {
            policy,
            sandbox,
            generators: Vec::new(),
            critic,
            sanitizer: Sanitizer::default(),
            reward: RewardEngine::new(config.reward.clone()),
            config,
        }
    }

    /// Register a generator. A later generator of the same family replaces
    /// the earlier one.
    pub fn with_generator(mut self, generator: Arc<dyn CandidateGenerator>) -> Self {
        self.generators.retain(|g| g.kind() != generator.kind());
        self.generators.push(generator);
        self
    }

    /// Register several generators.
    pub fn with_generators(
        mut self,
        generators: impl IntoIterator<Item = Arc<dyn CandidateGenerator>>,
    ) -> Self {
        for generator in generators {
            self = self.with_generator(generator);
        }
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.reward = RewardEngine::new(config.reward.clone());
        self.config = config;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn generator(&self, kind: AgentKind) -> Option<&Arc<dyn CandidateGenerator>> {
        self.generators.iter().find(|g| g.kind() == kind)
    }

    /// Run one optimization call to completion.
    pub async fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationReport> {
        let run_id = RunId::new();
        let started_at = run_id.started_at();

        request.validate()?;
        let sanitized = self.sanitizer.sanitize(&request.code)?;
        if sanitized.code.is_blank() {
            return Err(OptimizeError::Sanitization(format!(
                "nothing left after sanitization: {}",
                sanitized.warnings.join("; ")
            )));
        }
        for warning in &sanitized.warnings {
            warn!("{}", warning);
        }
        let code = sanitized.code;
        self.config.limits.check(&code)?;

        info!("Run {}: benchmarking baseline ({} lines)", run_id, code.lines());
        let bench = self.sandbox.benchmark(&code).await;
        if !bench.success {
            return Err(OptimizeError::BaselineFailed(
                bench.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let baseline = Baseline {
            runtime: bench.runtime,
            memory: bench.memory,
        };
        info!(
            "Baseline: {:.4}s, {:.2} MB",
            baseline.runtime, baseline.memory
        );

        let preferences = ObjectiveWeights::new(
            request.runtime_preference,
            request.memory_preference,
            request.quality_preference,
        );
        let observation = encode(code.text(), baseline.runtime, baseline.memory);
        let meta = self
            .policy
            .act(&observation, preferences, self.config.deterministic);
        info!(
            "Policy selected {} (mask {}, confidence {:.3}{})",
            meta.selected_action,
            meta.strategy_mask,
            meta.confidence,
            if meta.fallback { ", fallback" } else { "" }
        );

        let decision = apply_overrides(
            &meta,
            request.max_refinements,
            baseline.memory,
            request.memory_preference,
            &self.config,
        );

        let mut state = RefinementState::new(code.clone(), decision.action);
        for round in 1..=request.max_refinements {
            info!("Optimization round {}/{}", round, request.max_refinements);
            let entry = self.run_round(round, &mut state, &decision, baseline).await;
            state.finish_round(entry);
        }

        let (metrics, reward, optimized_code) = self.finalize(&state, &code, baseline).await;
        let report = OptimizationReport {
            run_id,
            optimized_code,
            strategy: state.best_agent,
            strategy_label: state
                .best_agent
                .map(|agent| agent.label().to_string())
                .unwrap_or_else(|| "None".to_string()),
            reward,
            metrics,
            trace: state.trace,
            objective_weights: decision.weights,
            meta_action: meta,
            applied_overrides: decision.overrides,
            refinement_depth: request.max_refinements,
            warnings: sanitized.warnings,
            started_at,
            finished_at: chrono::Utc::now(),
        };
        info!(
            "Run {} finished: strategy {}, reward {:.4}",
            report.run_id, report.strategy_label, report.reward
        );
        Ok(report)
    }

    async fn run_round(
        &self,
        round: usize,
        state: &mut RefinementState,
        decision: &Decision,
        baseline: Baseline,
    ) -> TraceEntry {
        let mut active = decision.mask.active();
        if active.is_empty() {
            warn!("No active agents, forcing runtime agent");
            active.push(AgentKind::Runtime);
        }

        let proposals = self.propose(&active, &state.working).await;
        let previous_rewards = state.previous_rewards();

        let mut scored: Vec<Scored> = Vec::new();
        for (agent, text) in proposals {
            let candidate = match self.sanitizer.sanitize(&text) {
                Ok(sanitized) => sanitized.code,
                Err(e) => {
                    warn!("{} candidate discarded: {}", agent.label(), e);
                    continue;
                }
            };

            let bench = self.sandbox.benchmark(&candidate).await;
            if !bench.success {
                warn!(
                    "{} candidate failed execution: {}",
                    agent.label(),
                    bench.error.as_deref().unwrap_or("unknown error")
                );
                continue;
            }

            let timeout = self.config.agent_timeout;
            let critique =
                match tokio::time::timeout(timeout, self.critic.score(&state.working, &candidate))
                    .await
                {
                    Ok(Ok(score)) => score.clamped(),
                    Ok(Err(e)) => {
                        warn!("Critic failed, using neutral score: {}", e);
                        CriticScore::neutral()
                    }
                    Err(_) => {
                        warn!("Critic timed out after {:?}, using neutral score", timeout);
                        CriticScore::neutral()
                    }
                };

            let result = self.reward.score(&RewardInputs {
                baseline_runtime: baseline.runtime,
                baseline_memory: baseline.memory,
                runtime: bench.runtime,
                memory: bench.memory,
                quality: critique.overall,
                test_pass_rate: bench.test_pass_rate,
                baseline_code: &state.working,
                candidate_code: &candidate,
                verdict: &critique.verdict,
                weights: decision.weights,
                previous_rewards: &previous_rewards,
                episode_actions: &state.episode_actions,
            });
            debug!(
                "{} candidate: reward {:.4} (runtime {:.4}s, memory {:.2} MB, quality {:.2})",
                agent.label(),
                result.reward,
                bench.runtime,
                bench.memory,
                critique.overall
            );

            scored.push(Scored {
                agent,
                code: candidate,
                bench,
                result,
            });
        }

        let survived = scored.len();
        let winner = scored
            .into_iter()
            .reduce(|best, next| if next.result.reward > best.result.reward { next } else { best });

        let promoted = match &winner {
            Some(w) => state.offer(w.agent, &w.code, w.result.reward),
            None => {
                warn!("No successful candidates in round {}", round);
                false
            }
        };
        if let (true, Some(w)) = (promoted, &winner) {
            info!("Round {}: promoted {} (reward {:.4})", round, w.agent.label(), w.result.reward);
        }

        let observation = encode(state.working.text(), baseline.runtime, baseline.memory);
        let diagnostics = self.policy.diagnostics(&observation);

        TraceEntry {
            round,
            agent: winner.as_ref().map(|w| w.agent),
            reward: winner.as_ref().map(|w| w.result.reward),
            attempted: active.len(),
            survived,
            diagnostics,
            weights: decision.weights,
            components: winner.as_ref().map(|w| w.result.components.clone()),
            runtime_improvement_pct: winner
                .as_ref()
                .map(|w| improvement_pct(baseline.runtime, w.bench.runtime))
                .unwrap_or(0.0),
            memory_improvement_pct: winner
                .as_ref()
                .map(|w| improvement_pct(baseline.memory, w.bench.memory))
                .unwrap_or(0.0),
            promoted,
        }
    }

    /// Ask every active family for a candidate concurrently.
    async fn propose(&self, active: &[AgentKind], code: &CodeArtifact) -> Vec<(AgentKind, String)> {
        let timeout = self.config.agent_timeout;
        let calls = active.iter().filter_map(|kind| {
            let Some(generator) = self.generator(*kind) else {
                warn!("No generator registered for {}", kind.label());
                return None;
            };
            Some(async move {
                (*kind, tokio::time::timeout(timeout, generator.propose(code)).await)
            })
        });

        join_all(calls)
            .await
            .into_iter()
            .filter_map(|(kind, outcome)| match outcome {
                Ok(Ok(text)) => Some((kind, text)),
                Ok(Err(e)) => {
                    warn!("{} failed: {}", kind.label(), e);
                    None
                }
                Err(_) => {
                    warn!("{} timed out after {:?}", kind.label(), timeout);
                    None
                }
            })
            .collect()
    }

    async fn finalize(
        &self,
        state: &RefinementState,
        input: &CodeArtifact,
        baseline: Baseline,
    ) -> (ReportMetrics, f64, String) {
        if !state.improved() {
            warn!("No successful optimization occurred, reporting baseline metrics");
            let metrics = ReportMetrics::new(
                baseline.runtime,
                baseline.memory,
                baseline.runtime,
                baseline.memory,
                1.0,
            );
            return (metrics, 0.0, input.text().to_string());
        }

        let bench = self.sandbox.benchmark(&state.best).await;
        let metrics = if bench.success {
            ReportMetrics::new(
                baseline.runtime,
                baseline.memory,
                bench.runtime,
                bench.memory,
                bench.test_pass_rate,
            )
        } else {
            warn!(
                "Final benchmark failed: {}",
                bench.error.as_deref().unwrap_or("unknown error")
            );
            ReportMetrics::new(
                baseline.runtime,
                baseline.memory,
                baseline.runtime,
                baseline.memory,
                0.0,
            )
        };
        (metrics, state.best_reward, state.best.text().to_string())
    }
}
