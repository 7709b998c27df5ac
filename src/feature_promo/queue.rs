use super::{
    ComputedData, Failure, FeatureId, FeaturePromoParams, FeaturePromoResult,
    FeaturePromoSpecification, PreconditionList, PreconditionListProvider,
};
use crate::sequence::SequenceHandle;
use crate::time::TimeProvider;
use crate::{QueueConfig, QueueError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A promo request waiting for its turn.
#[derive(Debug)]
pub struct QueuedFeaturePromo {
    pub params: FeaturePromoParams,
    pub required_preconditions: PreconditionList,
    pub wait_for_preconditions: PreconditionList,
    pub queue_time: Instant,
}

impl QueuedFeaturePromo {
    fn new(
        params: FeaturePromoParams,
        required_preconditions: PreconditionList,
        wait_for_preconditions: PreconditionList,
        queue_time: Instant,
    ) -> Self {
        Self {
            params,
            required_preconditions,
            wait_for_preconditions,
            queue_time,
        }
    }

    pub fn feature(&self) -> FeatureId {
        self.params.feature
    }
}

/// A promo claimed from the queue, ready to be shown.
#[derive(Debug)]
pub struct EligibleFeaturePromo {
    pub promo_params: FeaturePromoParams,
    pub cached_data: ComputedData,
}

impl EligibleFeaturePromo {
    fn new(promo_params: FeaturePromoParams) -> Self {
        Self {
            promo_params,
            cached_data: ComputedData::new(),
        }
    }
}

/// Holds pending promo requests and picks the next one that may be shown.
///
/// Every request is gated twice. The *required* preconditions must hold at
/// admission and keep holding; the first time they fail the request is
/// dropped. The *wait-for* preconditions only decide when a request becomes
/// eligible; a request that never gets there is dropped once it has waited
/// for the queue timeout.
///
/// Results of failed requests are never delivered inline. They are posted
/// to the owner's sequence, so a result callback may call back into the
/// queue.
pub struct FeaturePromoQueue {
    required_preconditions_provider: Arc<dyn PreconditionListProvider>,
    wait_for_preconditions_provider: Arc<dyn PreconditionListProvider>,
    time_provider: Arc<dyn TimeProvider>,
    sequence: SequenceHandle,
    queue_timeout: Duration,
    queued_promos: Vec<QueuedFeaturePromo>,
}

impl FeaturePromoQueue {
    pub fn new(
        required_preconditions_provider: Arc<dyn PreconditionListProvider>,
        wait_for_preconditions_provider: Arc<dyn PreconditionListProvider>,
        time_provider: Arc<dyn TimeProvider>,
        sequence: SequenceHandle,
        queue_timeout: Duration,
    ) -> Self {
        Self {
            required_preconditions_provider,
            wait_for_preconditions_provider,
            time_provider,
            sequence,
            queue_timeout,
            queued_promos: Vec::new(),
        }
    }

    pub fn from_config(
        config: &QueueConfig,
        required_preconditions_provider: Arc<dyn PreconditionListProvider>,
        wait_for_preconditions_provider: Arc<dyn PreconditionListProvider>,
        time_provider: Arc<dyn TimeProvider>,
        sequence: SequenceHandle,
    ) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::new(
            required_preconditions_provider,
            wait_for_preconditions_provider,
            time_provider,
            sequence,
            config.queue_timeout,
        ))
    }

    pub fn is_queued(&self, feature: FeatureId) -> bool {
        self.find_queued_promo(feature).is_some()
    }

    pub fn len(&self) -> usize {
        self.queued_promos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued_promos.is_empty()
    }

    pub fn queue_timeout(&self) -> Duration {
        self.queue_timeout
    }

    /// Queued features, oldest first.
    pub fn queued_features(&self) -> Vec<FeatureId> {
        self.queued_promos.iter().map(QueuedFeaturePromo::feature).collect()
    }

    /// Whether `params` would currently be admitted. Does not modify the
    /// queue.
    pub fn can_queue(
        &self,
        spec: &FeaturePromoSpecification,
        params: &FeaturePromoParams,
    ) -> FeaturePromoResult {
        self.required_preconditions_provider
            .get_preconditions(spec, params)
            .check_preconditions()
            .into()
    }

    /// Whether `params` could be shown right now, checking required then
    /// wait-for preconditions. Does not modify the queue.
    pub fn can_show(
        &self,
        spec: &FeaturePromoSpecification,
        params: &FeaturePromoParams,
    ) -> FeaturePromoResult {
        let result = self.can_queue(spec, params);
        if !result.is_ok() {
            return result;
        }
        self.wait_for_preconditions_provider
            .get_preconditions(spec, params)
            .check_preconditions()
            .into()
    }

    /// Admits `params`, or posts the reason it was refused to its callback.
    pub fn try_to_queue(&mut self, spec: &FeaturePromoSpecification, params: FeaturePromoParams) {
        let feature = params.feature;

        if self.is_queued(feature) {
            debug!(%feature, "promo already queued");
            self.reject(params, Failure::AlreadyQueued);
            return;
        }

        let mut required = self.required_preconditions_provider.get_preconditions(spec, &params);
        let check = required.check_preconditions();
        if let Some(failure) = check.failure() {
            debug!(
                %feature,
                %failure,
                precondition = ?check.failed_precondition,
                "promo refused by required preconditions"
            );
            self.reject(params, failure);
            return;
        }

        let wait_for = self.wait_for_preconditions_provider.get_preconditions(spec, &params);
        let queue_time = self.time_provider.now();
        self.queued_promos
            .push(QueuedFeaturePromo::new(params, required, wait_for, queue_time));

        metrics::counter!("user_education.queue.admitted").increment(1);
        info!(%feature, queued = self.queued_promos.len(), "promo queued");
    }

    /// Drops the queued request for `feature`, reporting `Canceled`.
    pub fn cancel(&mut self, feature: FeatureId) -> bool {
        let Some(index) = self.position(feature) else {
            return false;
        };
        let promo = self.queued_promos.remove(index);
        metrics::counter!("user_education.queue.canceled").increment(1);
        debug!(%feature, "queued promo canceled");
        self.post_failure(promo.params, Failure::Canceled);
        true
    }

    /// Evicts requests that can no longer be shown, then returns the oldest
    /// request whose wait-for preconditions all pass.
    pub fn update_and_identify_next_eligible_promo(&mut self) -> Option<FeatureId> {
        self.remove_ineligible_promos();
        self.identify_next_eligible_promo()
    }

    /// Removes `feature` from the queue and hands it over for display.
    ///
    /// # Panics
    ///
    /// If `feature` is not queued. Call this only with a feature just
    /// returned by [`update_and_identify_next_eligible_promo`](Self::update_and_identify_next_eligible_promo).
    pub fn unqueue_eligible_promo(&mut self, feature: FeatureId) -> EligibleFeaturePromo {
        match self.try_unqueue_eligible_promo(feature) {
            Ok(promo) => promo,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_unqueue_eligible_promo(
        &mut self,
        feature: FeatureId,
    ) -> Result<EligibleFeaturePromo, QueueError> {
        let index = self
            .position(feature)
            .ok_or(QueueError::NotQueued(feature))?;
        let QueuedFeaturePromo {
            params,
            mut required_preconditions,
            mut wait_for_preconditions,
            ..
        } = self.queued_promos.remove(index);

        let mut eligible = EligibleFeaturePromo::new(params);
        required_preconditions.extract_cached_data(&mut eligible.cached_data);
        wait_for_preconditions.extract_cached_data(&mut eligible.cached_data);

        metrics::counter!("user_education.queue.unqueued").increment(1);
        info!(%feature, "promo unqueued for display");
        Ok(eligible)
    }

    /// Reports `reason` to every queued request and empties the queue.
    pub fn fail_all(&mut self, reason: Failure) {
        if self.queued_promos.is_empty() {
            return;
        }
        info!(count = self.queued_promos.len(), %reason, "failing all queued promos");
        for promo in std::mem::take(&mut self.queued_promos) {
            self.evict(promo, reason);
        }
    }

    fn find_queued_promo(&self, feature: FeatureId) -> Option<&QueuedFeaturePromo> {
        self.queued_promos.iter().find(|p| p.feature() == feature)
    }

    fn position(&self, feature: FeatureId) -> Option<usize> {
        self.queued_promos.iter().position(|p| p.feature() == feature)
    }

    fn remove_ineligible_promos(&mut self) {
        self.remove_promos_with_failed_preconditions();
        self.remove_timed_out_promos();
    }

    fn remove_promos_with_failed_preconditions(&mut self) {
        let mut index = 0;
        while index < self.queued_promos.len() {
            let check = self.queued_promos[index].required_preconditions.check_preconditions();
            match check.failure() {
                Some(failure) => {
                    let promo = self.queued_promos.remove(index);
                    debug!(
                        feature = %promo.feature(),
                        %failure,
                        precondition = ?check.failed_precondition,
                        "required precondition no longer holds"
                    );
                    self.evict(promo, failure);
                }
                None => index += 1,
            }
        }
    }

    fn remove_timed_out_promos(&mut self) {
        let now = self.time_provider.now();
        let mut index = 0;
        while index < self.queued_promos.len() {
            let waited = now.saturating_duration_since(self.queued_promos[index].queue_time);
            if waited < self.queue_timeout {
                index += 1;
                continue;
            }
            let mut promo = self.queued_promos.remove(index);
            // Report why it never became eligible, if there still is a reason.
            let failure = promo
                .wait_for_preconditions
                .check_preconditions()
                .failure()
                .unwrap_or(Failure::TimedOut);
            warn!(
                feature = %promo.feature(),
                %failure,
                waited_ms = waited.as_millis() as u64,
                "queued promo timed out"
            );
            self.evict(promo, failure);
        }
    }

    fn identify_next_eligible_promo(&mut self) -> Option<FeatureId> {
        self.queued_promos
            .iter_mut()
            .find_map(|promo| {
                promo
                    .wait_for_preconditions
                    .check_preconditions()
                    .is_ok()
                    .then(|| promo.feature())
            })
    }

    fn evict(&self, promo: QueuedFeaturePromo, failure: Failure) {
        metrics::counter!("user_education.queue.evicted", "reason" => failure.as_str()).increment(1);
        self.post_failure(promo.params, failure);
    }

    fn reject(&self, params: FeaturePromoParams, failure: Failure) {
        metrics::counter!("user_education.queue.rejected", "reason" => failure.as_str()).increment(1);
        self.post_failure(params, failure);
    }

    fn post_failure(&self, mut params: FeaturePromoParams, failure: Failure) {
        if let Some(callback) = params.take_result_callback() {
            self.sequence
                .post_task(move || callback(FeaturePromoResult::failed(failure)));
        }
    }
}
