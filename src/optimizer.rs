use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use enumset::{EnumSet, EnumSetType};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{OptError, OptResult};
use crate::plan::Plan;
use crate::storage::{BucketLookup, OrgId, StaticBucketLookup};

/// Optional rewrites, switched on per organization.
#[derive(Debug, EnumSetType, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum Feature {
    /// Push windowed aggregates below a pushed down group.
    GroupWindowAggregateTranspose,
    /// Merge consecutive filters before pushing them down.
    MergeFilters,
}

impl Feature {
    /// Parses a comma separated list of feature names.
    pub fn parse_list(s: &str) -> OptResult<EnumSet<Feature>> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                Feature::from_str(name).map_err(|_| OptError::UnknownFeature(name.to_string()))
            })
            .collect()
    }
}

/// Everything a compilation knows beyond the plan itself.
#[derive(Clone, Debug)]
pub struct OptimizerContext {
    org_id: Option<OrgId>,
    now: DateTime<Utc>,
    features: EnumSet<Feature>,
    bucket_lookup: Arc<dyn BucketLookup>,
}

impl Default for OptimizerContext {
    fn default() -> Self {
        Self {
            org_id: None,
            now: Utc::now(),
            features: EnumSet::empty(),
            bucket_lookup: Arc::new(StaticBucketLookup::default()),
        }
    }
}

impl OptimizerContext {
    pub fn with_org(mut self, org_id: OrgId) -> Self {
        self.org_id = Some(org_id);
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn with_features(mut self, features: EnumSet<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_bucket_lookup(mut self, bucket_lookup: Arc<dyn BucketLookup>) -> Self {
        self.bucket_lookup = bucket_lookup;
        self
    }

    pub fn org_id(&self) -> Option<OrgId> {
        self.org_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn features(&self) -> EnumSet<Feature> {
        self.features
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(feature)
    }

    pub fn bucket_lookup(&self) -> &dyn BucketLookup {
        self.bucket_lookup.as_ref()
    }
}

/// An optimizer turns the plan it was built with into the best plan it can find.
pub trait Optimizer {
    fn context(&self) -> &OptimizerContext;

    fn find_best_plan(self) -> OptResult<Plan>;
}
