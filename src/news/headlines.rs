use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;

use super::feed::{FeedPage, NewsFeed};
use super::retry::RetryPolicy;
use super::{Market, TOP_HEADLINES_CATEGORY};
use crate::models::Headline;
use crate::pool::{execute_in_pool, Task};

const ID_WORD_COUNT: usize = 5;
const ID_MIN_WORD_CHARS: usize = 3;
const TOP_HEADLINES_QUERY: &str = "top news";
const UNKNOWN_PUBLICATION: &str = "Unknown";

/// Decode HTML character references, named (the full HTML5 set) and
/// numeric, in one pass. Unknown references are kept verbatim.
pub fn unescape_html(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}

/// Derive a headline's batch-local identifier from its description:
/// the first five words longer than three characters, lowercased and
/// joined with `-`.
pub fn headline_id(description: &str) -> String {
    unescape_html(description)
        .split(' ')
        .filter(|word| word.chars().count() > ID_MIN_WORD_CHARS)
        .take(ID_WORD_COUNT)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Fetches headlines for a market and collapses duplicates by identifier.
pub struct HeadlineFetcher {
    feed: Arc<dyn NewsFeed>,
    retry: RetryPolicy,
    max_workers: usize,
}

impl HeadlineFetcher {
    pub fn new(feed: Arc<dyn NewsFeed>, retry: RetryPolicy, max_workers: usize) -> Self {
        Self {
            feed,
            retry,
            max_workers,
        }
    }

    /// Fetch unique headlines, first occurrence wins.
    ///
    /// `limit` only applies to the top-headlines feed. A category that keeps
    /// failing is left out; the call only fails if every category did.
    pub async fn fetch(
        &self,
        market: Market,
        use_top_headlines: bool,
        limit: usize,
    ) -> Result<Vec<Headline>> {
        let pages = if use_top_headlines {
            let feed = self.feed.clone();
            let page = self
                .retry
                .run("top headlines fetch", || {
                    let feed = feed.clone();
                    async move { feed.search(market, TOP_HEADLINES_QUERY, limit).await }
                })
                .await
                .context("Failed to fetch top headlines")?;
            vec![(TOP_HEADLINES_CATEGORY, page)]
        } else {
            self.fetch_categories(market).await?
        };

        let headlines = collect_unique(pages);
        tracing::info!(
            market = %market,
            top_headlines = use_top_headlines,
            "Fetched {} unique headlines",
            headlines.len()
        );
        Ok(headlines)
    }

    async fn fetch_categories(&self, market: Market) -> Result<Vec<(&'static str, FeedPage)>> {
        let categories = market.categories();
        let tasks: Vec<Task<(&'static str, FeedPage)>> = categories
            .iter()
            .map(|&category| {
                let feed = self.feed.clone();
                let retry = self.retry.clone();
                Task::new("fetch_category", async move {
                    let page = retry
                        .run(category, || {
                            let feed = feed.clone();
                            async move { feed.category(market, category).await }
                        })
                        .await?;
                    Ok((category, page))
                })
            })
            .collect();

        let pages: Vec<_> = execute_in_pool(tasks, self.max_workers)
            .await
            .into_iter()
            .flatten()
            .collect();

        if pages.is_empty() && !categories.is_empty() {
            anyhow::bail!("Every news category fetch failed for market {market}");
        }
        Ok(pages)
    }
}

fn collect_unique(pages: Vec<(&'static str, FeedPage)>) -> Vec<Headline> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headlines = Vec::new();

    for (category, page) in pages {
        for article in page.value {
            let id = headline_id(&article.description);
            if !seen.insert(id.clone()) {
                continue;
            }
            headlines.push(Headline {
                id,
                title: unescape_html(&article.name),
                summary: unescape_html(&article.description),
                publication: article
                    .provider
                    .first()
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| UNKNOWN_PUBLICATION.to_string()),
                category: category.to_string(),
            });
        }
    }
    headlines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaygroundError;
    use crate::news::feed::{FeedArticle, FeedProvider};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;

    fn article(name: &str, description: &str) -> FeedArticle {
        FeedArticle {
            name: name.to_string(),
            description: description.to_string(),
            provider: vec![FeedProvider {
                name: "Wire".to_string(),
            }],
        }
    }

    /// Canned pages per category; categories listed in `failing` always 503.
    struct FakeFeed {
        pages: HashMap<String, Vec<FeedArticle>>,
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NewsFeed for FakeFeed {
        async fn category(&self, _market: Market, category: &str) -> Result<FeedPage> {
            self.calls.lock().push(category.to_string());
            if self.failing.iter().any(|f| *f == category) {
                return Err(PlaygroundError::UpstreamServer {
                    status: 503,
                    message: "unavailable".to_string(),
                }
                .into());
            }
            Ok(FeedPage {
                value: self.pages.get(category).cloned().unwrap_or_default(),
            })
        }

        async fn search(&self, _market: Market, query: &str, count: usize) -> Result<FeedPage> {
            self.calls.lock().push(format!("search:{query}:{count}"));
            Ok(FeedPage {
                value: vec![article("Top", "Markets slide after surprise rates decision")],
            })
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_unescape_named_and_numeric() {
        assert_eq!(unescape_html("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_html("&quot;hi&quot; &#39;x&#39; &#x27;y&#x27;"), "\"hi\" 'x' 'y'");
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
        assert_eq!(unescape_html("AT&T &bogus; &"), "AT&T &bogus; &");
        assert_eq!(unescape_html("Caf&eacute; &euro;5&hellip;"), "Café €5…");
    }

    #[test]
    fn test_headline_id_is_deterministic() {
        let desc = "The Prime Minister has announced a snap general election today";
        assert_eq!(headline_id(desc), "prime-minister-announced-snap-general");
        assert_eq!(headline_id(desc), headline_id(desc));
    }

    #[test]
    fn test_headline_id_unescapes_first() {
        assert_eq!(
            headline_id("Shares &amp; bonds rally &quot;strongly&quot; today"),
            "shares-bonds-rally-\"strongly\"-today"
        );
    }

    #[tokio::test]
    async fn test_duplicates_collapse_first_seen_wins() {
        let desc = "Central bank holds interest rates steady again";
        let mut pages = HashMap::new();
        pages.insert("Business".to_string(), vec![article("Rates held", desc)]);
        pages.insert("World".to_string(), vec![article("Rates held (world)", desc)]);
        let feed = FakeFeed {
            pages,
            failing: vec![],
            calls: Mutex::new(Vec::new()),
        };
        let fetcher = HeadlineFetcher::new(Arc::new(feed), fast_retry(), 5);
        let headlines = fetcher.fetch(Market::Gb, false, 20).await.unwrap();
        assert_eq!(headlines.len(), 1);
        assert_eq!(headlines[0].category, "Business");
        assert_eq!(headlines[0].title, "Rates held");
        assert_eq!(headlines[0].publication, "Wire");
    }

    #[tokio::test]
    async fn test_failing_category_is_dropped_after_retries() {
        let mut pages = HashMap::new();
        pages.insert(
            "Sports".to_string(),
            vec![article("Cup final", "Underdogs lift the trophy after extra time")],
        );
        let feed = Arc::new(FakeFeed {
            pages,
            failing: vec!["Health"],
            calls: Mutex::new(Vec::new()),
        });
        let fetcher = HeadlineFetcher::new(feed.clone(), fast_retry(), 5);
        let headlines = fetcher.fetch(Market::Gb, false, 20).await.unwrap();
        assert_eq!(headlines.len(), 1);
        let health_calls = feed.calls.lock().iter().filter(|c| c.as_str() == "Health").count();
        assert_eq!(health_calls, 3);
    }

    #[tokio::test]
    async fn test_all_categories_failing_is_an_error() {
        let feed = FakeFeed {
            pages: HashMap::new(),
            failing: Market::Gb.categories().to_vec(),
            calls: Mutex::new(Vec::new()),
        };
        let fetcher = HeadlineFetcher::new(Arc::new(feed), fast_retry(), 5);
        assert!(fetcher.fetch(Market::Gb, false, 20).await.is_err());
    }

    #[tokio::test]
    async fn test_top_headlines_use_search_feed() {
        let feed = Arc::new(FakeFeed {
            pages: HashMap::new(),
            failing: vec![],
            calls: Mutex::new(Vec::new()),
        });
        let fetcher = HeadlineFetcher::new(feed.clone(), fast_retry(), 5);
        let headlines = fetcher.fetch(Market::Us, true, 7).await.unwrap();
        assert_eq!(headlines.len(), 1);
        assert_eq!(headlines[0].category, TOP_HEADLINES_CATEGORY);
        assert_eq!(*feed.calls.lock(), vec!["search:top news:7".to_string()]);
    }
}
