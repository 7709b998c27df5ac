use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use user_education::feature_promo::{CallbackPrecondition, PreconditionId, PromoType};
use user_education::sequence::TaskSequence;
use user_education::time::ManualTimeProvider;
use user_education::{
    Failure, FeatureId, FeaturePromoParams, FeaturePromoQueue, FeaturePromoResult,
    FeaturePromoSpecification, PreconditionList, PreconditionListProvider,
};

const FEATURES: [FeatureId; 4] = [
    FeatureId::new("IPH_TabSearch"),
    FeatureId::new("IPH_ReadingList"),
    FeatureId::new("IPH_SidePanel"),
    FeatureId::new("IPH_PasswordManager"),
];
const WAIT: PreconditionId = PreconditionId::new("Wait");

#[derive(Debug, Clone)]
enum Op {
    Queue(usize),
    Cancel(usize),
    ToggleWaitFor(usize),
    Advance(u64),
    ScanAndClaim,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..FEATURES.len()).prop_map(Op::Queue),
        (0..FEATURES.len()).prop_map(Op::Cancel),
        (0..FEATURES.len()).prop_map(Op::ToggleWaitFor),
        (0u64..3_000).prop_map(Op::Advance),
        Just(Op::ScanAndClaim),
    ]
}

proptest! {
    /// Whatever the request sequence, a feature is queued at most once and
    /// every request is either still queued, claimed, or reported exactly
    /// once.
    #[test]
    fn prop_each_request_resolves_exactly_once(ops in prop::collection::vec(op(), 1..64)) {
        let mut sequence = TaskSequence::new();
        let clock = ManualTimeProvider::new();
        let waiting: Arc<Mutex<HashMap<FeatureId, bool>>> = Arc::default();

        let gate = waiting.clone();
        let wait_for: Arc<dyn PreconditionListProvider> =
            Arc::new(move |spec: &FeaturePromoSpecification, _: &FeaturePromoParams| {
                let gate = gate.clone();
                let feature = spec.feature;
                PreconditionList::new().with(CallbackPrecondition::from_predicate(
                    WAIT,
                    "wait",
                    Failure::BlockedByUi,
                    move || !gate.lock().get(&feature).copied().unwrap_or(false),
                ))
            });
        let required: Arc<dyn PreconditionListProvider> =
            Arc::new(|_: &FeaturePromoSpecification, _: &FeaturePromoParams| PreconditionList::new());
        let mut queue = FeaturePromoQueue::new(
            required,
            wait_for,
            Arc::new(clock.clone()),
            sequence.handle(),
            Duration::from_secs(5),
        );

        let reported: Arc<Mutex<Vec<(FeatureId, FeaturePromoResult)>>> = Arc::default();
        let mut requests = 0usize;
        let mut claimed = 0usize;

        for op in ops {
            match op {
                Op::Queue(i) => {
                    let feature = FEATURES[i];
                    let was_queued = queue.is_queued(feature);
                    let sink = reported.clone();
                    let params = FeaturePromoParams::new(feature)
                        .with_callback(move |result| sink.lock().push((feature, result)));
                    queue.try_to_queue(&FeaturePromoSpecification::new(feature, PromoType::Toast), params);
                    requests += 1;
                    prop_assert!(queue.is_queued(feature));
                    if was_queued {
                        sequence.run_until_idle();
                        let last = reported.lock().last().copied();
                        prop_assert_eq!(last, Some((feature, FeaturePromoResult::failed(Failure::AlreadyQueued))));
                    }
                }
                Op::Cancel(i) => {
                    let feature = FEATURES[i];
                    let was_queued = queue.is_queued(feature);
                    prop_assert_eq!(queue.cancel(feature), was_queued);
                    prop_assert!(!queue.is_queued(feature));
                }
                Op::ToggleWaitFor(i) => {
                    let mut gate = waiting.lock();
                    let entry = gate.entry(FEATURES[i]).or_insert(false);
                    *entry = !*entry;
                }
                Op::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                Op::ScanAndClaim => {
                    if let Some(feature) = queue.update_and_identify_next_eligible_promo() {
                        let promo = queue.unqueue_eligible_promo(feature);
                        prop_assert_eq!(promo.promo_params.feature, feature);
                        prop_assert!(!queue.is_queued(feature));
                        claimed += 1;
                    }
                }
            }

            let mut features = queue.queued_features();
            let len = features.len();
            features.sort();
            features.dedup();
            prop_assert_eq!(features.len(), len);
        }

        sequence.run_until_idle();
        prop_assert_eq!(reported.lock().len() + claimed + queue.len(), requests);
    }
}
