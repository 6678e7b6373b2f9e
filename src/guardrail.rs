//! Input and output guardrails.
//!
//! A guardrail is an ordinary async callable over (context, agent, data)
//! producing a [`GuardrailResult`]. A tripped result aborts the whole run at
//! the point of detection; the triggering result rides on the error so
//! callers can inspect or log it.
//!
//! Input guardrails belong to the run's *starting* agent and execute
//! sequentially before the first model call. Output guardrails belong to the
//! *final* agent of the run and execute against the final candidate output.
//! Agents visited mid-run via handoff contribute neither.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::agent::Agent;
use crate::context::RunContext;
use crate::error::{AgentsError, Result};

/// The outcome of a single guardrail check: an arbitrary info payload plus
/// the tripwire flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// Whatever the guardrail wants to surface for inspection (classification
    /// output, matched pattern, nested-run verdict).
    pub output_info: Value,
    /// When true the run aborts immediately.
    pub tripwire_triggered: bool,
}

impl GuardrailResult {
    /// A passing result.
    pub fn ok(output_info: Value) -> Self {
        Self {
            output_info,
            tripwire_triggered: false,
        }
    }

    /// A tripped result; aborts the run.
    pub fn tripped(output_info: Value) -> Self {
        Self {
            output_info,
            tripwire_triggered: true,
        }
    }
}

/// Validates the run's original input before the first model call.
#[async_trait]
pub trait InputGuardrail<C: Send + Sync + 'static = ()>: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        ctx: &RunContext<C>,
        agent: &Agent<C>,
        input: &str,
    ) -> Result<GuardrailResult>;
}

/// Validates the final candidate output of the run's last agent.
#[async_trait]
pub trait OutputGuardrail<C: Send + Sync + 'static = ()>: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        ctx: &RunContext<C>,
        agent: &Agent<C>,
        output: &Value,
    ) -> Result<GuardrailResult>;
}

type InputCheckFn<C> =
    dyn Fn(RunContext<C>, String) -> BoxFuture<'static, Result<GuardrailResult>> + Send + Sync;
type OutputCheckFn<C> =
    dyn Fn(RunContext<C>, Value) -> BoxFuture<'static, Result<GuardrailResult>> + Send + Sync;

/// Function-backed input guardrail; see [`input_guardrail`].
pub struct FnInputGuardrail<C: Send + Sync + 'static> {
    name: String,
    f: Arc<InputCheckFn<C>>,
}

#[async_trait]
impl<C: Send + Sync + 'static> InputGuardrail<C> for FnInputGuardrail<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext<C>,
        _agent: &Agent<C>,
        input: &str,
    ) -> Result<GuardrailResult> {
        (self.f)(ctx.clone(), input.to_string()).await
    }
}

/// Function-backed output guardrail; see [`output_guardrail`].
pub struct FnOutputGuardrail<C: Send + Sync + 'static> {
    name: String,
    f: Arc<OutputCheckFn<C>>,
}

#[async_trait]
impl<C: Send + Sync + 'static> OutputGuardrail<C> for FnOutputGuardrail<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext<C>,
        _agent: &Agent<C>,
        output: &Value,
    ) -> Result<GuardrailResult> {
        (self.f)(ctx.clone(), output.clone()).await
    }
}

/// Build an input guardrail from an async closure over (context, input).
pub fn input_guardrail<C, F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn InputGuardrail<C>>
where
    C: Send + Sync + 'static,
    F: Fn(RunContext<C>, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<GuardrailResult>> + Send + 'static,
{
    Arc::new(FnInputGuardrail {
        name: name.into(),
        f: Arc::new(move |ctx, input| Box::pin(f(ctx, input))),
    })
}

/// Build an output guardrail from an async closure over (context, output).
pub fn output_guardrail<C, F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn OutputGuardrail<C>>
where
    C: Send + Sync + 'static,
    F: Fn(RunContext<C>, Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<GuardrailResult>> + Send + 'static,
{
    Arc::new(FnOutputGuardrail {
        name: name.into(),
        f: Arc::new(move |ctx, output| Box::pin(f(ctx, output))),
    })
}

/// Runs guardrails and converts tripped results into the typed abort errors.
pub struct GuardrailEvaluator;

impl GuardrailEvaluator {
    /// Evaluate input guardrails sequentially. Returns all passing results;
    /// the first tripped guardrail aborts with its result attached.
    pub async fn check_input<C: Send + Sync + 'static>(
        guards: &[Arc<dyn InputGuardrail<C>>],
        ctx: &RunContext<C>,
        agent: &Agent<C>,
        input: &str,
    ) -> Result<Vec<GuardrailResult>> {
        let mut results = Vec::with_capacity(guards.len());
        for guard in guards {
            let res = guard.check(ctx, agent, input).await?;
            if res.tripwire_triggered {
                warn!(guardrail = %guard.name(), "input guardrail tripped");
                return Err(AgentsError::InputGuardrailTripwire {
                    guardrail: guard.name().to_string(),
                    result: res,
                });
            }
            results.push(res);
        }
        Ok(results)
    }

    /// Evaluate output guardrails against the final candidate output.
    pub async fn check_output<C: Send + Sync + 'static>(
        guards: &[Arc<dyn OutputGuardrail<C>>],
        ctx: &RunContext<C>,
        agent: &Agent<C>,
        output: &Value,
    ) -> Result<Vec<GuardrailResult>> {
        let mut results = Vec::with_capacity(guards.len());
        for guard in guards {
            let res = guard.check(ctx, agent, output).await?;
            if res.tripwire_triggered {
                warn!(guardrail = %guard.name(), "output guardrail tripped");
                return Err(AgentsError::OutputGuardrailTripwire {
                    guardrail: guard.name().to_string(),
                    result: res,
                });
            }
            results.push(res);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn length_guard(max: usize) -> Arc<dyn InputGuardrail<()>> {
        input_guardrail("max_length", move |_ctx, input: String| async move {
            if input.len() > max {
                Ok(GuardrailResult::tripped(json!({"len": input.len()})))
            } else {
                Ok(GuardrailResult::ok(json!({"len": input.len()})))
            }
        })
    }

    #[tokio::test]
    async fn test_input_guardrail_passes() {
        let agent = Agent::simple("A", "test");
        let ctx = RunContext::default();
        let guards = vec![length_guard(100)];

        let results = GuardrailEvaluator::check_input(&guards, &ctx, &agent, "short")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].tripwire_triggered);
    }

    #[tokio::test]
    async fn test_input_tripwire_carries_result() {
        let agent = Agent::simple("A", "test");
        let ctx = RunContext::default();
        let guards = vec![length_guard(3)];

        let err = GuardrailEvaluator::check_input(&guards, &ctx, &agent, "too long")
            .await
            .unwrap_err();
        match err {
            AgentsError::InputGuardrailTripwire { guardrail, result } => {
                assert_eq!(guardrail, "max_length");
                assert!(result.tripwire_triggered);
                assert_eq!(result.output_info["len"], 8);
            }
            other => panic!("expected tripwire, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_tripped_guard_wins() {
        let agent = Agent::simple("A", "test");
        let ctx = RunContext::default();
        let always: Arc<dyn InputGuardrail<()>> =
            input_guardrail("always", |_ctx, _input| async move {
                Ok(GuardrailResult::tripped(json!("first")))
            });
        let never = length_guard(1_000_000);
        let guards = vec![always, never];

        let err = GuardrailEvaluator::check_input(&guards, &ctx, &agent, "x")
            .await
            .unwrap_err();
        match err {
            AgentsError::InputGuardrailTripwire { guardrail, .. } => {
                assert_eq!(guardrail, "always")
            }
            other => panic!("expected tripwire, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_output_guardrail_sees_value() {
        let agent = Agent::simple("A", "test");
        let ctx = RunContext::default();
        let guards: Vec<Arc<dyn OutputGuardrail<()>>> =
            vec![output_guardrail("no_secret", |_ctx, output: Value| async move {
                let text = output.as_str().unwrap_or_default().to_string();
                if text.contains("secret") {
                    Ok(GuardrailResult::tripped(json!({"matched": "secret"})))
                } else {
                    Ok(GuardrailResult::ok(Value::Null))
                }
            })];

        let ok = GuardrailEvaluator::check_output(&guards, &ctx, &agent, &json!("hello")).await;
        assert!(ok.is_ok());

        let err =
            GuardrailEvaluator::check_output(&guards, &ctx, &agent, &json!("the secret plan"))
                .await
                .unwrap_err();
        assert!(matches!(err, AgentsError::OutputGuardrailTripwire { .. }));
    }
}
