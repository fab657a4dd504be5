//! Public lookups blended into general answers.
//!
//! Every selected service runs as its own task with its own deadline; the aggregator waits
//! for all of them under one overall bound and aborts whatever is still pending when that
//! bound passes. A source that fails, times out or finds nothing simply contributes nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinSet;

use rentdesk_core::config::LookupConfig;
use rentdesk_core::LookupSource;

const USER_AGENT: &str = concat!("rentdesk/", env!("CARGO_PKG_VERSION"));
const ITEM_WIDTH: usize = 280;

#[async_trait]
pub trait LookupService: Send + Sync {
    fn source(&self) -> LookupSource;

    /// Short text snippets relevant to `query`, best first. An empty list means nothing found.
    async fn lookup(&self, query: &str) -> Result<Vec<String>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LookupFailure {
    #[error("{0} lookup timed out")]
    Timeout(&'static str),
    #[error("{provider} lookup failed: {message}")]
    Transport { provider: &'static str, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextSection {
    pub source: LookupSource,
    pub items: Vec<String>,
}

/// Lookup results that made it in time, in source priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalContext {
    pub sections: Vec<ContextSection>,
}

impl ExternalContext {
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|section| {
                let items = section
                    .items
                    .iter()
                    .map(|item| format!("- {item}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{}:\n{items}", section.source.label())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn sources(&self) -> Vec<LookupSource> {
        self.sections.iter().map(|section| section.source).collect()
    }
}

pub struct LookupAggregator {
    services: BTreeMap<LookupSource, Arc<dyn LookupService>>,
    task_timeout: Duration,
    overall_timeout: Duration,
    max_items: usize,
}

impl LookupAggregator {
    pub fn new(task_timeout: Duration, max_items: usize) -> Self {
        Self {
            services: BTreeMap::new(),
            task_timeout,
            overall_timeout: task_timeout + Duration::from_secs(1),
            max_items: max_items.max(1),
        }
    }

    pub fn with_overall_timeout(mut self, overall_timeout: Duration) -> Self {
        self.overall_timeout = overall_timeout;
        self
    }

    /// Registers `service` for its source, replacing any earlier one.
    pub fn register(&mut self, service: Arc<dyn LookupService>) {
        self.services.insert(service.source(), service);
    }

    pub fn registered_sources(&self) -> Vec<LookupSource> {
        self.services.keys().copied().collect()
    }

    pub async fn gather(&self, query: &str, sources: &[LookupSource]) -> Option<ExternalContext> {
        let mut tasks = JoinSet::new();
        let mut selected = sources.to_vec();
        selected.sort();
        selected.dedup();

        for source in selected {
            let Some(service) = self.services.get(&source) else {
                tracing::debug!(
                    event_name = "lookup.source_unavailable",
                    source = source.label(),
                    "lookup source not configured"
                );
                continue;
            };
            let service = Arc::clone(service);
            let query = query.to_string();
            let task_timeout = self.task_timeout;
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(task_timeout, service.lookup(&query)).await
                {
                    Ok(Ok(items)) => Ok(items),
                    Ok(Err(error)) => Err(LookupFailure::Transport {
                        provider: source.label(),
                        message: format!("{error:#}"),
                    }),
                    Err(_) => Err(LookupFailure::Timeout(source.label())),
                };
                (source, outcome)
            });
        }

        let deadline = tokio::time::Instant::now() + self.overall_timeout;
        let mut collected: BTreeMap<LookupSource, Vec<String>> = BTreeMap::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((source, Ok(items))))) => {
                    let items = items
                        .into_iter()
                        .map(|item| clip(item.trim(), ITEM_WIDTH))
                        .filter(|item| !item.is_empty())
                        .take(self.max_items)
                        .collect::<Vec<_>>();
                    if !items.is_empty() {
                        collected.insert(source, items);
                    }
                }
                Ok(Some(Ok((_, Err(failure))))) => {
                    tracing::warn!(
                        event_name = "lookup.source_failed",
                        reason = %failure,
                        "lookup source contributed nothing"
                    );
                }
                Ok(Some(Err(join_error))) => {
                    tracing::warn!(
                        event_name = "lookup.task_failed",
                        error = %join_error,
                        "lookup task did not complete"
                    );
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        event_name = "lookup.deadline_elapsed",
                        pending = tasks.len(),
                        "aborting pending lookups"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        if collected.is_empty() {
            return None;
        }

        Some(ExternalContext {
            sections: collected
                .into_iter()
                .map(|(source, items)| ContextSection { source, items })
                .collect(),
        })
    }
}

/// Builds the aggregator with every service the configuration can support. News and
/// sports need a NewsAPI key; the others are keyless.
pub fn from_config(config: &LookupConfig) -> Result<LookupAggregator> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to create lookup HTTP client")?;

    let mut aggregator =
        LookupAggregator::new(Duration::from_secs(config.timeout_secs), config.max_items);
    if let Some(api_key) = &config.news_api_key {
        aggregator.register(Arc::new(NewsLookup::new(client.clone(), api_key.clone(), false)));
        aggregator.register(Arc::new(NewsLookup::new(client.clone(), api_key.clone(), true)));
    }
    aggregator.register(Arc::new(WikipediaLookup::new(client.clone())));
    aggregator.register(Arc::new(DuckDuckGoLookup::new(client)));
    Ok(aggregator)
}

/// NewsAPI headlines; the sports variant reads the sports category instead of searching.
pub struct NewsLookup {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    sports: bool,
}

impl NewsLookup {
    pub fn new(client: reqwest::Client, api_key: SecretString, sports: bool) -> Self {
        Self { client, api_key, base_url: "https://newsapi.org".to_string(), sports }
    }
}

#[async_trait]
impl LookupService for NewsLookup {
    fn source(&self) -> LookupSource {
        if self.sports {
            LookupSource::Sports
        } else {
            LookupSource::News
        }
    }

    async fn lookup(&self, query: &str) -> Result<Vec<String>> {
        let request = if self.sports {
            self.client
                .get(format!("{}/v2/top-headlines", self.base_url))
                .query(&[("category", "sports"), ("language", "en"), ("pageSize", "5")])
        } else {
            self.client.get(format!("{}/v2/everything", self.base_url)).query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", "5"),
            ])
        };

        let body: Value = request
            .header("X-Api-Key", self.api_key.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(news_items(&body))
    }
}

fn news_items(body: &Value) -> Vec<String> {
    body["articles"]
        .as_array()
        .map(|articles| {
            articles
                .iter()
                .filter_map(|article| {
                    let title = article["title"].as_str()?.trim();
                    match article["description"].as_str().map(str::trim) {
                        Some(description) if !description.is_empty() => {
                            Some(format!("{title}: {description}"))
                        }
                        _ => Some(title.to_string()),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Wikipedia page summary for the query treated as a page title.
pub struct WikipediaLookup {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaLookup {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, base_url: "https://en.wikipedia.org/api/rest_v1/page/summary".to_string() }
    }
}

#[async_trait]
impl LookupService for WikipediaLookup {
    fn source(&self) -> LookupSource {
        LookupSource::Wikipedia
    }

    async fn lookup(&self, query: &str) -> Result<Vec<String>> {
        let title = page_title(query);
        if title.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = reqwest::Url::parse(&self.base_url).context("invalid wikipedia base url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("wikipedia base url cannot carry a path"))?
            .push(&title);

        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body: Value = response.error_for_status()?.json().await?;
        Ok(body["extract"]
            .as_str()
            .map(str::trim)
            .filter(|extract| !extract.is_empty())
            .map(|extract| vec![extract.to_string()])
            .unwrap_or_default())
    }
}

fn page_title(query: &str) -> String {
    query
        .trim()
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.'))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// DuckDuckGo instant answers: the abstract first, then related topics.
pub struct DuckDuckGoLookup {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoLookup {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, base_url: "https://api.duckduckgo.com/".to_string() }
    }
}

#[async_trait]
impl LookupService for DuckDuckGoLookup {
    fn source(&self) -> LookupSource {
        LookupSource::Web
    }

    async fn lookup(&self, query: &str) -> Result<Vec<String>> {
        let body: Value = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(instant_answer_items(&body))
    }
}

fn instant_answer_items(body: &Value) -> Vec<String> {
    let mut items = Vec::new();
    if let Some(summary) = body["AbstractText"].as_str().map(str::trim) {
        if !summary.is_empty() {
            items.push(summary.to_string());
        }
    }
    if let Some(topics) = body["RelatedTopics"].as_array() {
        // Grouped topics nest their entries one level down under `Topics`.
        let flattened = topics.iter().flat_map(|topic| match topic["Topics"].as_array() {
            Some(nested) => nested.iter().collect::<Vec<_>>(),
            None => vec![topic],
        });
        items.extend(
            flattened
                .filter_map(|topic| topic["Text"].as_str())
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        );
    }
    items
}

fn clip(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::json;

    use super::{
        clip, instant_answer_items, news_items, page_title, LookupAggregator, LookupService,
    };
    use rentdesk_core::LookupSource;

    pub(crate) enum Behaviour {
        Items(Vec<&'static str>),
        Fail,
        Hang,
    }

    pub(crate) struct FakeLookup {
        pub source: LookupSource,
        pub behaviour: Behaviour,
        pub calls: AtomicUsize,
    }

    impl FakeLookup {
        pub(crate) fn new(source: LookupSource, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self { source, behaviour, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl LookupService for FakeLookup {
        fn source(&self) -> LookupSource {
            self.source
        }

        async fn lookup(&self, _query: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Items(items) => Ok(items.iter().map(|item| item.to_string()).collect()),
                Behaviour::Fail => Err(anyhow!("upstream returned 502")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(vec!["too late".to_string()])
                }
            }
        }
    }

    fn aggregator(services: Vec<Arc<FakeLookup>>) -> LookupAggregator {
        let mut aggregator = LookupAggregator::new(Duration::from_millis(100), 2)
            .with_overall_timeout(Duration::from_millis(300));
        for service in services {
            aggregator.register(service);
        }
        aggregator
    }

    #[tokio::test]
    async fn sections_follow_priority_order_and_item_cap() {
        let aggregator = aggregator(vec![
            FakeLookup::new(LookupSource::Web, Behaviour::Items(vec!["w1"])),
            FakeLookup::new(LookupSource::News, Behaviour::Items(vec!["n1", "n2", "n3"])),
            FakeLookup::new(LookupSource::Wikipedia, Behaviour::Items(vec!["  ", "k1"])),
        ]);

        let context = aggregator
            .gather("ps5 launch", &[LookupSource::Web, LookupSource::Wikipedia, LookupSource::News])
            .await
            .expect("context");

        assert_eq!(
            context.sources(),
            vec![LookupSource::News, LookupSource::Wikipedia, LookupSource::Web]
        );
        assert_eq!(context.sections[0].items, vec!["n1", "n2"]);
        assert_eq!(context.render(), "News:\n- n1\n- n2\n\nWikipedia:\n- k1\n\nWeb:\n- w1");
    }

    #[tokio::test]
    async fn all_failing_sources_yield_no_context() {
        let aggregator = aggregator(vec![
            FakeLookup::new(LookupSource::News, Behaviour::Fail),
            FakeLookup::new(LookupSource::Wikipedia, Behaviour::Hang),
            FakeLookup::new(LookupSource::Web, Behaviour::Items(vec![])),
        ]);

        let started = Instant::now();
        let context = aggregator
            .gather("anything", &[LookupSource::News, LookupSource::Wikipedia, LookupSource::Web])
            .await;

        assert_eq!(context, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn one_failure_does_not_hide_other_sources() {
        let aggregator = aggregator(vec![
            FakeLookup::new(LookupSource::News, Behaviour::Hang),
            FakeLookup::new(LookupSource::Web, Behaviour::Items(vec!["answer"])),
        ]);

        let context =
            aggregator.gather("q", &[LookupSource::News, LookupSource::Web]).await.expect("context");

        assert_eq!(context.sources(), vec![LookupSource::Web]);
    }

    #[tokio::test]
    async fn overall_deadline_cuts_off_slow_tasks() {
        let mut aggregator = LookupAggregator::new(Duration::from_secs(10), 3)
            .with_overall_timeout(Duration::from_millis(100));
        aggregator.register(FakeLookup::new(LookupSource::News, Behaviour::Hang));

        let started = Instant::now();
        assert_eq!(aggregator.gather("q", &[LookupSource::News]).await, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn only_selected_and_registered_sources_are_called() {
        let news = FakeLookup::new(LookupSource::News, Behaviour::Items(vec!["n"]));
        let web = FakeLookup::new(LookupSource::Web, Behaviour::Items(vec!["w"]));
        let aggregator = aggregator(vec![news.clone(), web.clone()]);

        let context = aggregator
            .gather("q", &[LookupSource::Web, LookupSource::Sports, LookupSource::Web])
            .await
            .expect("context");

        assert_eq!(context.sources(), vec![LookupSource::Web]);
        assert_eq!(news.calls.load(Ordering::SeqCst), 0);
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn provider_payloads_become_snippets() {
        let news = json!({"articles": [
            {"title": "Console prices drop", "description": "Retailers cut prices."},
            {"title": "Match tonight", "description": null},
            {"description": "no title"}
        ]});
        assert_eq!(
            news_items(&news),
            vec!["Console prices drop: Retailers cut prices.", "Match tonight"]
        );

        let duck = json!({
            "AbstractText": "The PlayStation 5 is a home console.",
            "RelatedTopics": [
                {"Text": "PS5 Digital Edition"},
                {"Name": "See also", "Topics": [{"Text": "Xbox Series X"}]}
            ]
        });
        assert_eq!(
            instant_answer_items(&duck),
            vec!["The PlayStation 5 is a home console.", "PS5 Digital Edition", "Xbox Series X"]
        );
    }

    #[test]
    fn page_titles_and_clipping() {
        assert_eq!(page_title("  PlayStation 5?  "), "PlayStation_5");
        assert_eq!(clip("abcdef", 3), "abc...");
        assert_eq!(clip("abc", 3), "abc");
    }
}
