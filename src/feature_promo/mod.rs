//! Feature promo vocabulary and the admission queue.
//!
//! A feature promo is an in-product educational callout tied to a single
//! browser feature. Requests to show one are funneled through
//! [`FeaturePromoQueue`], which gates them on two tiers of preconditions and
//! hands at most one eligible promo back to the controller at a time.

pub mod computed_data;
pub mod precondition;
pub mod provider;
pub mod queue;
pub mod result;

pub use computed_data::*;
pub use precondition::*;
pub use provider::*;
pub use queue::*;
pub use result::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::oneshot;

/// Stable identifier of the feature a promo is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FeatureId(&'static str);

impl FeatureId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromoType {
    Toast,
    Snooze,
    Tutorial,
    CustomAction,
    Custom,
}

/// Static description of a promo, registered once per feature.
///
/// Providers read it to decide which preconditions apply; the queue never
/// stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePromoSpecification {
    pub feature: FeatureId,
    pub promo_type: PromoType,
    pub anchor_element_id: Option<String>,
}

impl FeaturePromoSpecification {
    pub fn new(feature: FeatureId, promo_type: PromoType) -> Self {
        Self {
            feature,
            promo_type,
            anchor_element_id: None,
        }
    }

    pub fn with_anchor(mut self, anchor_element_id: impl Into<String>) -> Self {
        self.anchor_element_id = Some(anchor_element_id.into());
        self
    }
}

/// Invoked exactly once with the final outcome of a promo request.
pub type ShowPromoResultCallback = Box<dyn FnOnce(FeaturePromoResult) + Send + 'static>;

/// Per-request parameters for showing a promo.
pub struct FeaturePromoParams {
    pub feature: FeatureId,
    pub body_params: Vec<String>,
    pub title_params: Vec<String>,
    pub show_promo_result_callback: Option<ShowPromoResultCallback>,
}

impl FeaturePromoParams {
    pub fn new(feature: FeatureId) -> Self {
        Self {
            feature,
            body_params: Vec::new(),
            title_params: Vec::new(),
            show_promo_result_callback: None,
        }
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(FeaturePromoResult) + Send + 'static,
    {
        self.show_promo_result_callback = Some(Box::new(callback));
        self
    }

    /// Builds params whose result is delivered through a one-shot channel.
    ///
    /// The receiver resolves once the request fails, or is closed without a
    /// value if the params are dropped after being claimed for display.
    pub fn with_result_channel(feature: FeatureId) -> (Self, oneshot::Receiver<FeaturePromoResult>) {
        let (tx, rx) = oneshot::channel();
        let params = Self::new(feature).with_callback(move |result| {
            // Receiver may have been dropped; nobody is listening then.
            let _ = tx.send(result);
        });
        (params, rx)
    }

    pub fn with_body_params(mut self, params: Vec<String>) -> Self {
        self.body_params = params;
        self
    }

    pub fn with_title_params(mut self, params: Vec<String>) -> Self {
        self.title_params = params;
        self
    }

    pub fn take_result_callback(&mut self) -> Option<ShowPromoResultCallback> {
        self.show_promo_result_callback.take()
    }
}

impl fmt::Debug for FeaturePromoParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeaturePromoParams")
            .field("feature", &self.feature)
            .field("body_params", &self.body_params)
            .field("title_params", &self.title_params)
            .field(
                "show_promo_result_callback",
                &self.show_promo_result_callback.is_some(),
            )
            .finish()
    }
}
