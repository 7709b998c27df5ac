use super::{FeaturePromoParams, FeaturePromoSpecification, PreconditionList};
use std::sync::Arc;

/// Builds a fresh [`PreconditionList`] for a promo request.
///
/// Called on every pre-flight check and every admission; lists are never
/// shared between calls.
pub trait PreconditionListProvider: Send + Sync {
    fn get_preconditions(
        &self,
        spec: &FeaturePromoSpecification,
        params: &FeaturePromoParams,
    ) -> PreconditionList;
}

impl<F> PreconditionListProvider for F
where
    F: Fn(&FeaturePromoSpecification, &FeaturePromoParams) -> PreconditionList + Send + Sync,
{
    fn get_preconditions(
        &self,
        spec: &FeaturePromoSpecification,
        params: &FeaturePromoParams,
    ) -> PreconditionList {
        self(spec, params)
    }
}

/// Concatenates the lists of several providers.
///
/// Providers added first are checked first, so their failures take
/// priority.
#[derive(Default, Clone)]
pub struct ComposingPreconditionListProvider {
    providers: Vec<Arc<dyn PreconditionListProvider>>,
}

impl ComposingPreconditionListProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, provider: Arc<dyn PreconditionListProvider>) {
        self.providers.push(provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn PreconditionListProvider>) -> Self {
        self.add_provider(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl PreconditionListProvider for ComposingPreconditionListProvider {
    fn get_preconditions(
        &self,
        spec: &FeaturePromoSpecification,
        params: &FeaturePromoParams,
    ) -> PreconditionList {
        let mut list = PreconditionList::new();
        for provider in &self.providers {
            list.append(provider.get_preconditions(spec, params));
        }
        list
    }
}
