//! Concurrent per-region queries merged into one report.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, warn};

/// One row returned by a partition, tagged with the partition it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regional<T> {
    pub region: String,
    pub item: T,
}

/// A partition whose query failed. Its rows are absent from the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFailure {
    pub region: String,
    pub error: String,
}

/// Merged result of a [`fan_out`].
#[derive(Debug, Clone)]
pub struct FanOutReport<T> {
    /// Rows ordered by region; rows of one region keep the order the query returned.
    pub rows: Vec<Regional<T>>,
    /// Partitions that failed, ordered by region.
    pub failed: Vec<PartitionFailure>,
}

impl<T> Default for FanOutReport<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> FanOutReport<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Run `query` once per distinct partition, concurrently, and merge the rows.
///
/// A failing partition is recorded in [`FanOutReport::failed`] and does not
/// affect the others. Partitions returning no rows contribute nothing.
pub async fn fan_out<I, R, T, E, Q, Fut>(partitions: I, query: Q) -> FanOutReport<T>
where
    I: IntoIterator<Item = R>,
    R: Into<String>,
    Q: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let regions: BTreeSet<String> = partitions.into_iter().map(Into::into).collect();
    let mut tasks = JoinSet::new();
    let mut names = HashMap::with_capacity(regions.len());

    for region in regions {
        let fut = query(region.clone());
        let handle = tasks.spawn(async move { fut.await.map_err(|e| e.to_string()) });
        names.insert(handle.id(), region);
    }

    let mut report = FanOutReport::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, Ok(items))) => {
                let region = names.remove(&id).unwrap_or_default();
                debug!(region = %region, rows = items.len(), "Partition answered");
                report.rows.extend(items.into_iter().map(|item| Regional {
                    region: region.clone(),
                    item,
                }));
            }
            Ok((id, Err(error))) => {
                let region = names.remove(&id).unwrap_or_default();
                warn!(region = %region, error = %error, "Partition query failed");
                report.failed.push(PartitionFailure { region, error });
            }
            Err(join_error) => {
                let region = names.remove(&join_error.id()).unwrap_or_default();
                warn!(region = %region, error = %join_error, "Partition task failed");
                report.failed.push(PartitionFailure {
                    region,
                    error: join_error.to_string(),
                });
            }
        }
    }

    report.rows.sort_by(|a, b| a.region.cmp(&b.region));
    report.failed.sort_by(|a, b| a.region.cmp(&b.region));
    report
}
