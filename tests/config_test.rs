use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use user_education::sequence::TaskSequence;
use user_education::time::SystemTimeProvider;
use user_education::{
    ConfigError, FeaturePromoParams, FeaturePromoQueue, FeaturePromoSpecification,
    PreconditionList, PreconditionListProvider, QueueConfig, UserEducationError,
};

fn empty_provider() -> Arc<dyn PreconditionListProvider> {
    Arc::new(|_: &FeaturePromoSpecification, _: &FeaturePromoParams| PreconditionList::new())
}

#[test]
fn test_config_loaded_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "queue_timeout_ms": 2500 }}"#).unwrap();

    let config = QueueConfig::from_file(file.path()).unwrap();
    assert_eq!(config.queue_timeout, Duration::from_millis(2500));

    let sequence = TaskSequence::new();
    let queue = FeaturePromoQueue::from_config(
        &config,
        empty_provider(),
        empty_provider(),
        Arc::new(SystemTimeProvider),
        sequence.handle(),
    )
    .unwrap();
    assert_eq!(queue.queue_timeout(), Duration::from_millis(2500));
    assert!(queue.is_empty());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = QueueConfig::from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_queue_refuses_invalid_config() {
    let config = QueueConfig {
        queue_timeout: Duration::ZERO,
    };
    let sequence = TaskSequence::new();
    let result = FeaturePromoQueue::from_config(
        &config,
        empty_provider(),
        empty_provider(),
        Arc::new(SystemTimeProvider),
        sequence.handle(),
    );
    assert!(matches!(
        result,
        Err(UserEducationError::Config(ConfigError::InvalidTimeout))
    ));
}
