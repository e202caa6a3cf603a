//! Tiered role classification.
//!
//! A cascade is an ordered list of tiers that may defer, followed by a
//! default tier that always answers. [`Cascade::run`] folds over the tiers
//! and stops at the first one that resolves.

use std::str::FromStr;

use qfill_model::{Classified, Condition, Source, TierAttempt, TierOutcome};
use qfill_oracle::{ClassificationRequest, Oracle, OracleReply};

pub type Tier<'a, T, R> = Box<dyn Fn(&T) -> TierOutcome<R> + 'a>;
pub type DefaultTier<'a, T, R> = Box<dyn Fn(&T) -> (R, f32) + 'a>;

/// Final role plus the attempts that led to it, in tier order.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeResult<R> {
    pub classified: Classified<R>,
    pub trail: Vec<TierAttempt>,
}

pub struct Cascade<'a, T, R> {
    tiers: Vec<(Source, Tier<'a, T, R>)>,
    fallback: DefaultTier<'a, T, R>,
}

impl<'a, T, R> Cascade<'a, T, R> {
    pub fn new(fallback: impl Fn(&T) -> (R, f32) + 'a) -> Self {
        Self {
            tiers: Vec::new(),
            fallback: Box::new(fallback),
        }
    }

    /// Append a tier; tiers run in the order they were added.
    #[must_use]
    pub fn tier(mut self, source: Source, tier: impl Fn(&T) -> TierOutcome<R> + 'a) -> Self {
        self.tiers.push((source, Box::new(tier)));
        self
    }

    pub fn run(&self, target: &T) -> CascadeResult<R> {
        let mut trail = Vec::with_capacity(self.tiers.len() + 1);
        let resolved = self.tiers.iter().fold(None, |found, (source, tier)| {
            found.or_else(|| match tier(target) {
                TierOutcome::Resolved { role, confidence } => {
                    trail.push(TierAttempt {
                        source: *source,
                        resolved: true,
                        condition: None,
                    });
                    Some(Classified::new(role, confidence, *source))
                }
                TierOutcome::Deferred(condition) => {
                    trail.push(TierAttempt {
                        source: *source,
                        resolved: false,
                        condition: Some(condition),
                    });
                    None
                }
            })
        });
        let classified = resolved.unwrap_or_else(|| {
            let (role, confidence) = (self.fallback)(target);
            trail.push(TierAttempt {
                source: Source::Default,
                resolved: true,
                condition: None,
            });
            Classified::new(role, confidence, Source::Default)
        });
        CascadeResult { classified, trail }
    }
}

/// Ask the oracle and accept the verdict only when it names one of the
/// request's candidate roles with a confidence in `[0, 1]`.
pub fn oracle_tier<R: FromStr>(
    oracle: &dyn Oracle,
    request: &ClassificationRequest,
) -> TierOutcome<R> {
    let verdict = match oracle.classify(request) {
        Ok(OracleReply::Answer(verdict)) => verdict,
        Ok(OracleReply::Unable(reason)) => {
            return TierOutcome::Deferred(Condition::oracle(format!("declined: {reason}")));
        }
        Err(err) => return TierOutcome::Deferred(Condition::oracle(err.to_string())),
    };
    if !(0.0..=1.0).contains(&verdict.confidence) {
        return TierOutcome::Deferred(Condition::oracle(format!(
            "confidence {} outside [0, 1]",
            verdict.confidence
        )));
    }
    let named = request
        .candidates
        .iter()
        .any(|c| c.eq_ignore_ascii_case(verdict.role.trim()));
    match verdict.role.parse::<R>() {
        Ok(role) if named => TierOutcome::resolved(role, verdict.confidence),
        _ => TierOutcome::Deferred(Condition::oracle(format!(
            "verdict '{}' is not a candidate role",
            verdict.role
        ))),
    }
}
