use super::{ComputedData, DataKey, Failure, FeaturePromoResult};
use std::any::Any;
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreconditionId(&'static str);

impl PreconditionId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PreconditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A single named gate on showing a promo.
///
/// Implementations may memoize expensive lookups between calls to
/// [`check_precondition`](Self::check_precondition) and hand them over via
/// [`extract_cached_data`](Self::extract_cached_data) once the promo is
/// actually going to be shown.
pub trait FeaturePromoPrecondition: Send {
    fn identifier(&self) -> PreconditionId;

    /// Human-readable description, used in logs.
    fn name(&self) -> &str;

    fn check_precondition(&mut self) -> FeaturePromoResult;

    /// Moves any cached values into `data`. Default: nothing cached.
    fn extract_cached_data(&mut self, _data: &mut ComputedData) {}
}

/// Result of evaluating a [`PreconditionList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    pub result: FeaturePromoResult,
    pub failed_precondition: Option<PreconditionId>,
}

impl CheckResult {
    pub fn success() -> Self {
        Self {
            result: FeaturePromoResult::success(),
            failed_precondition: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure(&self) -> Option<Failure> {
        self.result.failure()
    }
}

impl From<CheckResult> for FeaturePromoResult {
    fn from(check: CheckResult) -> Self {
        check.result
    }
}

/// Ordered set of preconditions; the first failure wins.
#[derive(Default)]
pub struct PreconditionList {
    preconditions: Vec<Box<dyn FeaturePromoPrecondition>>,
}

impl PreconditionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_precondition(&mut self, precondition: Box<dyn FeaturePromoPrecondition>) {
        self.preconditions.push(precondition);
    }

    pub fn with<P>(mut self, precondition: P) -> Self
    where
        P: FeaturePromoPrecondition + 'static,
    {
        self.add_precondition(Box::new(precondition));
        self
    }

    /// Appends every precondition of `other`, keeping their order.
    pub fn append(&mut self, mut other: PreconditionList) {
        self.preconditions.append(&mut other.preconditions);
    }

    pub fn check_preconditions(&mut self) -> CheckResult {
        for precondition in self.preconditions.iter_mut() {
            let result = precondition.check_precondition();
            if !result.is_ok() {
                trace!(
                    precondition = precondition.name(),
                    result = %result,
                    "precondition failed"
                );
                return CheckResult {
                    result,
                    failed_precondition: Some(precondition.identifier()),
                };
            }
        }
        CheckResult::success()
    }

    pub fn extract_cached_data(&mut self, data: &mut ComputedData) {
        for precondition in self.preconditions.iter_mut() {
            precondition.extract_cached_data(data);
        }
    }

    pub fn identifiers(&self) -> Vec<PreconditionId> {
        self.preconditions.iter().map(|p| p.identifier()).collect()
    }

    pub fn len(&self) -> usize {
        self.preconditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preconditions.is_empty()
    }
}

impl fmt::Debug for PreconditionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.preconditions.iter().map(|p| p.identifier()))
            .finish()
    }
}

/// Precondition backed by a closure that is re-run on every check.
pub struct CallbackPrecondition {
    id: PreconditionId,
    name: String,
    check: Box<dyn FnMut() -> FeaturePromoResult + Send>,
}

impl CallbackPrecondition {
    pub fn new<F>(id: PreconditionId, name: impl Into<String>, check: F) -> Self
    where
        F: FnMut() -> FeaturePromoResult + Send + 'static,
    {
        Self {
            id,
            name: name.into(),
            check: Box::new(check),
        }
    }

    /// Passes while `predicate` holds, fails with `failure` otherwise.
    pub fn from_predicate<F>(
        id: PreconditionId,
        name: impl Into<String>,
        failure: Failure,
        mut predicate: F,
    ) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::new(id, name, move || {
            if predicate() {
                FeaturePromoResult::success()
            } else {
                failure.into()
            }
        })
    }
}

impl FeaturePromoPrecondition for CallbackPrecondition {
    fn identifier(&self) -> PreconditionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn check_precondition(&mut self) -> FeaturePromoResult {
        (self.check)()
    }
}

/// Computes a value once, keeps it, and later exports it under `key`.
///
/// The compute closure is retried on each check until it yields a value;
/// until then the precondition fails with `failure`.
pub struct CachingPrecondition<T> {
    id: PreconditionId,
    name: String,
    key: DataKey<T>,
    failure: Failure,
    compute: Box<dyn FnMut() -> Option<T> + Send>,
    cached: Option<T>,
}

impl<T: Any + Send> CachingPrecondition<T> {
    pub fn new<F>(
        id: PreconditionId,
        name: impl Into<String>,
        key: DataKey<T>,
        failure: Failure,
        compute: F,
    ) -> Self
    where
        F: FnMut() -> Option<T> + Send + 'static,
    {
        Self {
            id,
            name: name.into(),
            key,
            failure,
            compute: Box::new(compute),
            cached: None,
        }
    }

    pub fn cached(&self) -> Option<&T> {
        self.cached.as_ref()
    }
}

impl<T: Any + Send> FeaturePromoPrecondition for CachingPrecondition<T> {
    fn identifier(&self) -> PreconditionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn check_precondition(&mut self) -> FeaturePromoResult {
        if self.cached.is_none() {
            self.cached = (self.compute)();
        }
        if self.cached.is_some() {
            FeaturePromoResult::success()
        } else {
            self.failure.into()
        }
    }

    fn extract_cached_data(&mut self, data: &mut ComputedData) {
        if let Some(value) = self.cached.take() {
            data.insert(self.key, value);
        }
    }
}
