//! Best-effort tag enrichment applied to records at write time.

use crate::model::normalize_tags;
use crate::policy::TaggingPolicy;
use log::{debug, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

/// Error raised by a single tagger; never surfaced to `add` callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tagger {tagger} failed: {reason}")]
pub struct TaggerError {
    /// Name of the failing tagger.
    pub tagger: String,
    /// Diagnostic message.
    pub reason: String,
}

impl TaggerError {
    pub fn new(tagger: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tagger: tagger.into(),
            reason: reason.into(),
        }
    }
}

/// Produces classification labels for a record about to be written.
pub trait Tagger: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Compute tags for `(user_id, role, content)`.
    fn tag(&self, user_id: &str, role: &str, content: &str) -> Result<Vec<String>, TaggerError>;
}

/// Adapter turning a closure into a named tagger.
pub struct FnTagger<F> {
    name: String,
    func: F,
}

impl<F> FnTagger<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &str, &str) -> Result<Vec<String>, TaggerError> + Send + Sync,
    {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Tagger for FnTagger<F>
where
    F: Fn(&str, &str, &str) -> Result<Vec<String>, TaggerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self, user_id: &str, role: &str, content: &str) -> Result<Vec<String>, TaggerError> {
        (self.func)(user_id, role, content)
    }
}

/// Result of one tagger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggerOutcome {
    /// Tagger succeeded.
    Tagged(Vec<String>),
    /// Tagger returned an error or panicked.
    Failed(TaggerError),
}

/// Ordered set of taggers run on every `add`.
#[derive(Clone, Default)]
pub struct TaggerPipeline {
    taggers: Vec<Arc<dyn Tagger>>,
    policy: TaggingPolicy,
}

impl std::fmt::Debug for TaggerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.taggers.iter().map(|tagger| tagger.name()).collect();
        f.debug_struct("TaggerPipeline")
            .field("taggers", &names)
            .field("policy", &self.policy)
            .finish()
    }
}

impl TaggerPipeline {
    pub fn new(taggers: Vec<Arc<dyn Tagger>>) -> Self {
        Self {
            taggers,
            policy: TaggingPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TaggingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append a tagger at the end of the pipeline.
    pub fn push(&mut self, tagger: Arc<dyn Tagger>) {
        self.taggers.push(tagger);
    }

    pub fn len(&self) -> usize {
        self.taggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taggers.is_empty()
    }

    /// Invoke every tagger in order, capturing failures and panics.
    pub fn run(&self, user_id: &str, role: &str, content: &str) -> Vec<TaggerOutcome> {
        let mut outcomes = Vec::with_capacity(self.taggers.len());
        for tagger in &self.taggers {
            let started = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| tagger.tag(user_id, role, content)));
            let elapsed = started.elapsed();
            let over_budget = self
                .policy
                .slow_tagger_warn
                .is_some_and(|budget| elapsed > budget);
            if over_budget {
                warn!(
                    "slow tagger (tagger={}, elapsed_ms={})",
                    tagger.name(),
                    elapsed.as_millis()
                );
            }
            let outcome = match result {
                Ok(Ok(tags)) => TaggerOutcome::Tagged(tags),
                Ok(Err(err)) => TaggerOutcome::Failed(err),
                Err(panic) => TaggerOutcome::Failed(TaggerError::new(
                    tagger.name(),
                    panic_message(panic.as_ref()),
                )),
            };
            if let TaggerOutcome::Failed(err) = &outcome {
                warn!("tagger skipped (user_id={user_id}): {err}");
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Caller tags followed by every successful tagger output, deduplicated.
    pub fn tags_for(
        &self,
        user_id: &str,
        role: &str,
        content: &str,
        caller_tags: Vec<String>,
    ) -> Vec<String> {
        let outcomes = self.run(user_id, role, content);
        let merged = merge_tags(caller_tags, outcomes);
        debug!(
            "tags computed (user_id={user_id}, taggers={}, tags={})",
            self.taggers.len(),
            merged.len()
        );
        merged
    }
}

/// Merge caller tags with successful outcomes, discarding failures.
pub fn merge_tags(caller_tags: Vec<String>, outcomes: Vec<TaggerOutcome>) -> Vec<String> {
    let produced = outcomes.into_iter().flat_map(|outcome| match outcome {
        TaggerOutcome::Tagged(tags) => tags,
        TaggerOutcome::Failed(_) => Vec::new(),
    });
    normalize_tags(caller_tags.into_iter().chain(produced))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{FnTagger, Tagger, TaggerError, TaggerOutcome, TaggerPipeline, merge_tags};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn fixed(name: &str, tags: &'static [&'static str]) -> Arc<dyn Tagger> {
        Arc::new(FnTagger::new(name, move |_: &str, _: &str, _: &str| {
            Ok(tags.iter().map(|tag| tag.to_string()).collect())
        }))
    }

    #[test]
    fn merges_caller_tags_first_and_dedups() {
        let pipeline =
            TaggerPipeline::new(vec![fixed("a", &["mood", "x"]), fixed("b", &["x", "y"])]);
        let caller = vec!["y".to_string(), "mood".to_string()];
        let tags = pipeline.tags_for("u1", "user", "hi", caller);
        assert_eq!(tags, vec!["y", "mood", "x"]);
    }

    #[test]
    fn failing_tagger_is_isolated() {
        let failing: Arc<dyn Tagger> = Arc::new(FnTagger::new(
            "broken",
            |_: &str, _: &str, _: &str| -> Result<Vec<String>, TaggerError> {
                Err(TaggerError::new("broken", "boom"))
            },
        ));
        let pipeline = TaggerPipeline::new(vec![failing, fixed("ok", &["kept"])]);
        let outcomes = pipeline.run("u1", "user", "hi");
        assert!(matches!(outcomes[0], TaggerOutcome::Failed(_)));
        assert_eq!(outcomes[1], TaggerOutcome::Tagged(vec!["kept".to_string()]));
        assert_eq!(merge_tags(Vec::new(), outcomes), vec!["kept"]);
    }

    #[test]
    fn panicking_tagger_is_captured() {
        let panicking: Arc<dyn Tagger> = Arc::new(FnTagger::new(
            "panics",
            |_: &str, _: &str, _: &str| -> Result<Vec<String>, TaggerError> {
                panic!("tagger exploded")
            },
        ));
        let pipeline = TaggerPipeline::new(vec![panicking]);
        let outcomes = pipeline.run("u1", "user", "hi");
        match &outcomes[0] {
            TaggerOutcome::Failed(err) => {
                assert_eq!(err.tagger, "panics");
                assert!(err.reason.contains("tagger exploded"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
