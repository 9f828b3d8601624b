//! Target queue: the ordered, per-run fixed list of pages to archive
//!
//! A [`TargetQueue`] is a snapshot. Once built it is never mutated, and a crawl run
//! owns exactly one of them for its whole lifetime.

mod target;

pub use target::{Target, TargetFilter};

use crate::backend::{BackendResult, TargetSource};
use std::collections::HashMap;

/// Immutable, ordered sequence of targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetQueue {
    targets: Vec<Target>,
}

impl TargetQueue {
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Target> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }
}

impl From<Vec<Target>> for TargetQueue {
    fn from(targets: Vec<Target>) -> Self {
        Self::new(targets)
    }
}

impl<'a> IntoIterator for &'a TargetQueue {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

/// Lists targets by status filter
///
/// # Arguments
///
/// * `source` - The backend read path
/// * `filter` - Which article rows to list
/// * `offset` - Optional offset into the listing
/// * `limit` - Optional maximum number of targets
///
/// # Returns
///
/// The targets in backend order. An empty queue is valid and yields a run that
/// finishes immediately.
pub async fn fetch_targets(
    source: &dyn TargetSource,
    filter: TargetFilter,
    offset: Option<usize>,
    limit: Option<usize>,
) -> BackendResult<TargetQueue> {
    let targets = source.fetch_articles(filter, offset, limit).await?;
    tracing::info!("Fetched {} targets ({})", targets.len(), filter);
    for target in &targets {
        tracing::debug!("  target {} -> {}", target.id, target.origin_url);
    }
    Ok(TargetQueue::new(targets))
}

/// Fetches specific targets, in the order the ids were given
///
/// Ids the backend does not return are dropped with a warning. Repeated ids keep
/// their first position only.
pub async fn fetch_targets_by_id(
    source: &dyn TargetSource,
    ids: &[String],
) -> BackendResult<TargetQueue> {
    let fetched = source.fetch_articles_by_id(ids).await?;
    let targets = order_by_ids(ids, fetched);
    tracing::info!("Picked {} of {} requested targets", targets.len(), ids.len());
    Ok(TargetQueue::new(targets))
}

fn order_by_ids(ids: &[String], fetched: Vec<Target>) -> Vec<Target> {
    let mut by_id: HashMap<String, Target> = HashMap::with_capacity(fetched.len());
    for target in fetched {
        by_id.entry(target.id.clone()).or_insert(target);
    }

    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        match by_id.remove(id) {
            Some(target) => ordered.push(target),
            None if ordered.iter().any(|t: &Target| &t.id == id) => {}
            None => tracing::warn!("Backend has no article with id {}", id),
        }
    }
    ordered
}
