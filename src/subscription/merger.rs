//! Merging many subscriptions into one client document.
//!
//! # Data Flow
//! ```text
//! sources (ordered)
//!     → fan-out: SourceFetcher per source, at most `max_concurrency` at once
//!     → slot[i] = proxies of source i (completion order ignored)
//!     → merge deadline: sources still pending keep an empty slot
//!     → assemble():
//!         proxies      = slot[0] ++ slot[1] ++ ...
//!         proxy-groups = [select group, per-source groups..., auto group]
//!     → written onto a deep copy of the base template
//! ```
//!
//! # Design Decisions
//! - Sources that yield nothing are skipped, not fatal
//! - Nothing usable at all is a distinct [`MergeError`], never an empty document
//! - Assembly is a pure function of fetched data, separate from I/O

use std::collections::HashSet;
use std::time::Duration;
use futures_util::stream::{self, StreamExt};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::observability::metrics;
use crate::subscription::document::{deep_copy, MergedDocument, GROUPS_KEY, PROXIES_KEY};
use crate::subscription::fetcher::{HttpClient, SourceFetcher};
use crate::subscription::model::{Proxy, SelectionGroup};
use crate::subscription::source::Source;

/// Merge-level failures. Per-source failures never show up here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("no subscription sources configured")]
    NoSources,

    #[error("no usable subscriptions: all {attempted} sources returned no proxies")]
    NoUsableSubscriptions { attempted: usize },

    #[error("base template is not a mapping")]
    InvalidTemplate,
}

/// Headroom left between the merge deadline and the request timeout for
/// assembly and serialization.
const DEADLINE_HEADROOM: Duration = Duration::from_secs(1);

/// Reserved group identities and fan-out limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSettings {
    pub select_group_name: String,
    pub auto_group_name: String,
    pub probe_url: String,
    pub probe_interval_secs: u64,
    pub max_concurrency: usize,
    /// Upper bound on the whole fan-out. Sources not finished by then are
    /// treated as empty.
    pub deadline: Duration,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

impl MergeSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            select_group_name: config.merge.select_group_name.clone(),
            auto_group_name: config.merge.auto_group_name.clone(),
            probe_url: config.merge.probe_url.clone(),
            probe_interval_secs: config.merge.probe_interval_secs,
            max_concurrency: config.fetch.max_concurrency,
            deadline: merge_deadline(config.listener.request_timeout_secs),
        }
    }
}

/// Fan-out deadline for a given request timeout, never below one second.
fn merge_deadline(request_timeout_secs: u64) -> Duration {
    Duration::from_secs(request_timeout_secs)
        .saturating_sub(DEADLINE_HEADROOM)
        .max(Duration::from_secs(1))
}

/// Fetches every source and assembles the merged document.
#[derive(Clone)]
pub struct ConfigMerger<C> {
    fetcher: SourceFetcher<C>,
    settings: MergeSettings,
}

impl<C: HttpClient> ConfigMerger<C> {
    pub fn new(fetcher: SourceFetcher<C>, settings: MergeSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Build a merger (fetcher included) from service configuration.
    pub fn from_config(client: C, config: &ServiceConfig) -> Self {
        let fetcher = SourceFetcher::new(
            client,
            config.fetch.user_agent.clone(),
            Duration::from_secs(config.fetch.timeout_secs),
        );
        Self::new(fetcher, MergeSettings::from_config(config))
    }

    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Fetch all `sources` and merge them into a copy of `template`.
    pub async fn merge(
        &self,
        sources: &[Source],
        template: &Value,
    ) -> Result<MergedDocument, MergeError> {
        if sources.is_empty() {
            metrics::record_merge("no_sources");
            return Err(MergeError::NoSources);
        }
        if !template.is_mapping() {
            metrics::record_merge("invalid_template");
            return Err(MergeError::InvalidTemplate);
        }

        let fetched = self.fetch_all(sources).await;
        let result = assemble(sources, fetched, template, &self.settings);
        metrics::record_merge(match &result {
            Ok(_) => "ok",
            Err(MergeError::NoUsableSubscriptions { .. }) => "no_usable",
            Err(_) => "error",
        });
        result
    }

    /// Fetch concurrently, returning proxies in source order. Fetches still
    /// running at the deadline are dropped and leave their slot empty.
    async fn fetch_all(&self, sources: &[Source]) -> Vec<Vec<Proxy>> {
        let mut slots: Vec<Vec<Proxy>> = (0..sources.len()).map(|_| Vec::new()).collect();
        let fetcher = &self.fetcher;

        let mut completed = stream::iter(sources.iter().cloned().enumerate())
            .map(|(index, source): (usize, Source)| async move {
                (index, fetcher.fetch(&source).await.into_proxies())
            })
            .buffer_unordered(self.settings.max_concurrency.max(1));

        let deadline = tokio::time::sleep(self.settings.deadline);
        tokio::pin!(deadline);

        let mut finished = 0;
        loop {
            tokio::select! {
                next = completed.next() => match next {
                    Some((index, proxies)) => {
                        slots[index] = proxies;
                        finished += 1;
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    tracing::warn!(
                        pending = sources.len() - finished,
                        deadline_ms = self.settings.deadline.as_millis() as u64,
                        "Merge deadline reached; skipping unfinished sources"
                    );
                    break;
                }
            }
        }
        slots
    }
}

/// Assemble the merged document from per-source proxy lists.
///
/// `fetched[i]` holds the proxies of `sources[i]`.
pub fn assemble(
    sources: &[Source],
    fetched: Vec<Vec<Proxy>>,
    template: &Value,
    settings: &MergeSettings,
) -> Result<MergedDocument, MergeError> {
    if sources.is_empty() {
        return Err(MergeError::NoSources);
    }
    let mut root: Mapping = match deep_copy(template) {
        Value::Mapping(root) => root,
        _ => return Err(MergeError::InvalidTemplate),
    };

    let mut proxies: Vec<Proxy> = Vec::new();
    let mut groups: Vec<SelectionGroup> = Vec::new();

    for (source, source_proxies) in sources.iter().zip(fetched) {
        if source_proxies.is_empty() {
            tracing::debug!(source = %source.name, "Skipping source without proxies");
            continue;
        }
        if source.name == settings.select_group_name || source.name == settings.auto_group_name {
            tracing::warn!(source = %source.name, "Source name collides with a reserved group name");
        }

        let names = source_proxies.iter().map(|p| p.name().to_string()).collect();
        groups.push(SelectionGroup::select(source.name.clone(), names));
        proxies.extend(source_proxies);
    }

    if proxies.is_empty() {
        return Err(MergeError::NoUsableSubscriptions {
            attempted: sources.len(),
        });
    }

    let duplicates = duplicate_proxy_names(&proxies);
    if !duplicates.is_empty() {
        tracing::warn!(names = ?duplicates, "Duplicate proxy names across subscriptions");
    }

    groups.push(SelectionGroup::url_test(
        settings.auto_group_name.clone(),
        proxies.iter().map(|p| p.name().to_string()).collect(),
        settings.probe_url.clone(),
        settings.probe_interval_secs,
    ));

    let top_level = SelectionGroup::select(
        settings.select_group_name.clone(),
        groups.iter().map(|g| g.name.clone()).collect(),
    );
    groups.insert(0, top_level);

    tracing::info!(
        sources = sources.len(),
        proxies = proxies.len(),
        groups = groups.len(),
        "Subscriptions merged"
    );

    root.insert(
        PROXIES_KEY.into(),
        Value::Sequence(proxies.into_iter().map(Proxy::into_value).collect()),
    );
    root.insert(
        GROUPS_KEY.into(),
        Value::Sequence(groups.iter().map(SelectionGroup::to_value).collect()),
    );

    Ok(MergedDocument::new(root))
}

/// Names used by more than one proxy, in first-seen order.
pub fn duplicate_proxy_names(proxies: &[Proxy]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();
    for proxy in proxies {
        if !seen.insert(proxy.name()) && reported.insert(proxy.name()) {
            duplicates.push(proxy.name().to_string());
        }
    }
    duplicates
}
