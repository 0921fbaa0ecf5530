//! Object filter narrowing the object list reported in metadata

use crate::metadata::ObjectMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which objects appear in metadata
///
/// `Only` with an empty set is a real state: no objects are reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectFilter {
    #[default]
    Unfiltered,
    Only(BTreeSet<String>),
}

impl ObjectFilter {
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectFilter::Only(ids.into_iter().map(Into::into).collect())
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, ObjectFilter::Only(_))
    }

    pub fn admits(&self, object_id: &str) -> bool {
        match self {
            ObjectFilter::Unfiltered => true,
            ObjectFilter::Only(ids) => ids.contains(object_id),
        }
    }

    pub fn apply<'a>(
        &self,
        objects: impl IntoIterator<Item = &'a ObjectMetadata>,
    ) -> Vec<ObjectMetadata> {
        objects
            .into_iter()
            .filter(|o| self.admits(&o.object_id))
            .cloned()
            .collect()
    }
}
