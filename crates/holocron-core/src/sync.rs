//! Catalog reconciliation against the upstream films API
//!
//! A run walks the upstream pages in order, following each page's `next`
//! pointer, and upserts every record into the movie store by episode
//! number:
//!
//! ```text
//! Idle -> FetchingPage -> MergingPage -> (FetchingPage | Done)
//!                \______________\______-> Failed | Cancelled
//! ```
//!
//! Pages are merged as soon as they arrive, so a failure on page N leaves
//! pages 1..N-1 committed. Records sharing an episode number are applied in
//! arrival order and the last one wins. The engine never deletes movies.

use holocron_db::{DbError, MovieStore, NewMovie};
use holocron_proxy::{FilmRecord, FilmSource};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CoreError;

/// Default upstream films listing
pub const DEFAULT_ROOT_URL: &str = "https://swapi.dev/api/films/";

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// First page of the upstream listing
    pub root_url: String,
    /// Upper bound on pages fetched in one run
    pub max_pages: usize,
    /// Timeout applied to each store call
    pub store_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            max_pages: 100,
            store_timeout: Duration::from_secs(10),
        }
    }
}

/// Sync engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    FetchingPage,
    MergingPage,
    Done,
    Failed,
    Cancelled,
}

/// Outcome counters of a sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub pages: usize,
    pub created: usize,
    pub updated: usize,
}

enum Upsert {
    Created,
    Updated,
}

/// Mirrors the upstream films listing into the movie store
pub struct SyncEngine {
    movies: Arc<dyn MovieStore>,
    source: Arc<dyn FilmSource>,
    config: SyncConfig,
    state: Mutex<SyncState>,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(movies: Arc<dyn MovieStore>, source: Arc<dyn FilmSource>, config: SyncConfig) -> Self {
        info!(
            "Initializing sync engine (root: {}, max_pages: {})",
            config.root_url, config.max_pages
        );

        Self {
            movies,
            source,
            config,
            state: Mutex::new(SyncState::Idle),
        }
    }

    /// State of the current or most recent run
    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Run one full sync pass
    pub async fn run(&self) -> Result<SyncReport, CoreError> {
        self.run_until_cancelled(&CancellationToken::new()).await
    }

    /// Run one full sync pass, stopping before the next page fetch once
    /// `cancel` fires
    pub async fn run_until_cancelled(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, CoreError> {
        info!("Starting catalog sync from {}", self.config.root_url);
        let started = Instant::now();
        let mut report = SyncReport::default();

        let result = self.walk_pages(cancel, &mut report).await;

        match &result {
            Ok(()) => {
                self.set_state(SyncState::Done);
                metrics::counter!("holocron_sync_runs_total", "outcome" => "done").increment(1);
                info!(
                    "Catalog sync complete in {:?}: {} pages, {} created, {} updated",
                    started.elapsed(),
                    report.pages,
                    report.created,
                    report.updated
                );
            }
            Err(CoreError::Cancelled) => {
                self.set_state(SyncState::Cancelled);
                metrics::counter!("holocron_sync_runs_total", "outcome" => "cancelled")
                    .increment(1);
                warn!(
                    "Catalog sync cancelled after {} pages ({} created, {} updated kept)",
                    report.pages, report.created, report.updated
                );
            }
            Err(e) => {
                self.set_state(SyncState::Failed);
                metrics::counter!("holocron_sync_runs_total", "outcome" => "failed").increment(1);
                warn!(
                    "Catalog sync failed after {} pages ({} created, {} updated kept): {}",
                    report.pages, report.created, report.updated, e
                );
            }
        }

        result.map(|()| report)
    }

    async fn walk_pages(
        &self,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<(), CoreError> {
        let root = Url::parse(&self.config.root_url)
            .map_err(|e| CoreError::InvalidUrl(format!("{}: {}", self.config.root_url, e)))?;

        let mut visited = HashSet::new();
        let mut next = Some(root);

        while let Some(url) = next.take() {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            if report.pages >= self.config.max_pages {
                return Err(CoreError::PageLimitExceeded(self.config.max_pages));
            }
            if !visited.insert(url.clone()) {
                return Err(CoreError::PaginationCycle(url.to_string()));
            }

            self.set_state(SyncState::FetchingPage);
            let page = self.source.fetch_page(url.as_str()).await?;
            report.pages += 1;
            metrics::counter!("holocron_sync_pages_total").increment(1);
            debug!("Fetched page {} ({} records)", url, page.results.len());

            self.set_state(SyncState::MergingPage);
            for record in page.results {
                match self.upsert(normalize(record)).await? {
                    Upsert::Created => report.created += 1,
                    Upsert::Updated => report.updated += 1,
                }
            }

            next = match page.next.as_deref().map(str::trim) {
                Some(link) if !link.is_empty() => Some(
                    url.join(link)
                        .map_err(|e| CoreError::InvalidUrl(format!("{}: {}", link, e)))?,
                ),
                _ => None,
            };
        }

        Ok(())
    }

    /// Create the movie, or fully overwrite the one holding the same episode number
    async fn upsert(&self, movie: NewMovie) -> Result<Upsert, CoreError> {
        let episode = movie.episode_number;

        if let Some(mut current) = self
            .store("find", self.movies.find_movie_by_episode(episode))
            .await?
        {
            current.replace_fields(movie);
            self.store("update", self.movies.update_movie(&current)).await?;
            metrics::counter!("holocron_sync_records_total", "action" => "updated").increment(1);
            debug!("Updated episode {}", episode);
            return Ok(Upsert::Updated);
        }

        match self
            .store("create", self.movies.create_movie(movie.clone()))
            .await
        {
            Ok(_) => {
                metrics::counter!("holocron_sync_records_total", "action" => "created")
                    .increment(1);
                debug!("Created episode {}", episode);
                Ok(Upsert::Created)
            }
            // Created concurrently by an admin write; overwrite it
            Err(CoreError::Conflict(_)) => {
                let mut current = self
                    .store("find", self.movies.find_movie_by_episode(episode))
                    .await?
                    .ok_or_else(|| CoreError::NotFound(format!("Episode {}", episode)))?;
                current.replace_fields(movie);
                self.store("update", self.movies.update_movie(&current)).await?;
                Ok(Upsert::Updated)
            }
            Err(e) => Err(e),
        }
    }

    async fn store<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, CoreError> {
        tokio::time::timeout(self.config.store_timeout, fut)
            .await
            .map_err(|_| CoreError::Timeout(format!("movie store {}", op)))?
            .map_err(CoreError::from)
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock() = state;
    }
}

/// Trim text fields; blank optional fields become absent
fn normalize(record: FilmRecord) -> NewMovie {
    fn clean(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    NewMovie {
        episode_number: record.episode_number,
        title: record.title.trim().to_string(),
        director: clean(record.director),
        release_date: clean(record.release_date),
        description: clean(record.description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use holocron_db::{Database, Movie};
    use holocron_proxy::{FilmPage, ProxyError};
    use std::collections::HashMap;

    const ROOT: &str = "https://films.test/api/films/";
    const PAGE_2: &str = "https://films.test/api/films/?page=2";

    /// Serves canned pages keyed by URL; unknown URLs answer 500
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<String, FilmPage>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with_page(mut self, url: &str, records: Vec<FilmRecord>, next: Option<&str>) -> Self {
            self.pages.insert(
                url.to_string(),
                FilmPage {
                    results: records,
                    next: next.map(str::to_string),
                },
            );
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().clone()
        }
    }

    #[async_trait]
    impl FilmSource for FakeSource {
        async fn fetch_page(&self, url: &str) -> Result<FilmPage, ProxyError> {
            self.fetched.lock().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ProxyError::UpstreamError {
                    status: 500,
                    message: "boom".to_string(),
                })
        }
    }

    fn film(episode: i64, title: &str) -> FilmRecord {
        FilmRecord {
            episode_number: episode,
            title: title.to_string(),
            director: Some("George Lucas".to_string()),
            release_date: Some("1977-05-25".to_string()),
            description: Some("A long time ago".to_string()),
        }
    }

    async fn engine(source: FakeSource) -> (SyncEngine, Database, Arc<FakeSource>) {
        let db = Database::in_memory().await.unwrap();
        let source = Arc::new(source);
        let engine = SyncEngine::new(
            Arc::new(db.clone()),
            source.clone(),
            SyncConfig {
                root_url: ROOT.to_string(),
                ..SyncConfig::default()
            },
        );
        (engine, db, source)
    }

    #[tokio::test]
    async fn test_two_page_feed_stores_two_movies() {
        let source = FakeSource::default()
            .with_page(ROOT, vec![film(1, "The Phantom Menace")], Some(PAGE_2))
            .with_page(PAGE_2, vec![film(2, "Attack of the Clones")], None);
        let (engine, db, source) = engine(source).await;

        let report = engine.run().await.unwrap();

        assert_eq!(report, SyncReport { pages: 2, created: 2, updated: 0 });
        assert_eq!(db.list_movies().await.unwrap().len(), 2);
        assert_eq!(source.fetched(), vec![ROOT.to_string(), PAGE_2.to_string()]);
        assert_eq!(engine.state(), SyncState::Done);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let source = FakeSource::default()
            .with_page(ROOT, vec![film(4, "A New Hope")], Some(PAGE_2))
            .with_page(PAGE_2, vec![film(5, "The Empire Strikes Back")], None);
        let (engine, db, _) = engine(source).await;

        engine.run().await.unwrap();
        let first = db.list_movies().await.unwrap();

        let report = engine.run().await.unwrap();
        let second = db.list_movies().await.unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_existing_episode_is_overwritten_not_duplicated() {
        let source =
            FakeSource::default().with_page(ROOT, vec![film(19, "Upstream Title")], None);
        let (engine, db, _) = engine(source).await;

        let local = db
            .create_movie(NewMovie {
                episode_number: 19,
                title: "Local Title".to_string(),
                director: Some("Someone".to_string()),
                release_date: None,
                description: Some("local notes".to_string()),
            })
            .await
            .unwrap();

        engine.run().await.unwrap();

        let movies = db.list_movies().await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, local.id);
        assert_eq!(movies[0].title, "Upstream Title");
        assert_eq!(movies[0].description.as_deref(), Some("A long time ago"));
    }

    #[tokio::test]
    async fn test_absent_upstream_fields_clear_local_values() {
        let sparse = FilmRecord {
            episode_number: 7,
            title: "The Force Awakens".to_string(),
            director: None,
            release_date: Some("  ".to_string()),
            description: None,
        };
        let source = FakeSource::default().with_page(ROOT, vec![sparse], None);
        let (engine, db, _) = engine(source).await;

        db.create_movie(NewMovie {
            episode_number: 7,
            title: "Old".to_string(),
            director: Some("J. J. Abrams".to_string()),
            release_date: Some("2015-12-18".to_string()),
            description: Some("kept?".to_string()),
        })
        .await
        .unwrap();

        engine.run().await.unwrap();

        let movie = db.find_movie_by_episode(7).await.unwrap().unwrap();
        assert_eq!(movie.director, None);
        assert_eq!(movie.release_date, None);
        assert_eq!(movie.description, None);
    }

    #[tokio::test]
    async fn test_duplicate_keys_last_write_wins() {
        let source = FakeSource::default()
            .with_page(ROOT, vec![film(3, "First"), film(3, "Second")], Some(PAGE_2))
            .with_page(PAGE_2, vec![film(3, "Third")], None);
        let (engine, db, _) = engine(source).await;

        let report = engine.run().await.unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 2);
        let movies = db.list_movies().await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Third");
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_pages() {
        // PAGE_2 is not served, so the second fetch fails
        let source =
            FakeSource::default().with_page(ROOT, vec![film(1, "The Phantom Menace")], Some(PAGE_2));
        let (engine, db, _) = engine(source).await;

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, CoreError::Proxy(_)));
        assert!(err.is_upstream());
        assert_eq!(db.list_movies().await.unwrap().len(), 1);
        assert_eq!(engine.state(), SyncState::Failed);
    }

    #[tokio::test]
    async fn test_relative_next_is_resolved() {
        let source = FakeSource::default()
            .with_page(ROOT, vec![film(1, "The Phantom Menace")], Some("?page=2"))
            .with_page(PAGE_2, vec![film(2, "Attack of the Clones")], Some(""));
        let (engine, db, source) = engine(source).await;

        engine.run().await.unwrap();

        assert_eq!(source.fetched()[1], PAGE_2);
        assert_eq!(db.list_movies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cyclic_next_is_stopped() {
        let source = FakeSource::default()
            .with_page(ROOT, vec![film(1, "The Phantom Menace")], Some(PAGE_2))
            .with_page(PAGE_2, vec![film(2, "Attack of the Clones")], Some(ROOT));
        let (engine, db, source) = engine(source).await;

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, CoreError::PaginationCycle(_)));
        assert_eq!(source.fetched().len(), 2);
        assert_eq!(db.list_movies().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_page_limit_is_enforced() {
        let mut source = FakeSource::default();
        for page in 1..=5 {
            let url = format!("{}?page={}", ROOT, page);
            let next = format!("{}?page={}", ROOT, page + 1);
            source = source.with_page(&url, vec![film(page, "Film")], Some(&next));
        }
        let db = Database::in_memory().await.unwrap();
        let source = Arc::new(source);
        let engine = SyncEngine::new(
            Arc::new(db.clone()),
            source.clone(),
            SyncConfig {
                root_url: format!("{}?page=1", ROOT),
                max_pages: 3,
                ..SyncConfig::default()
            },
        );

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, CoreError::PageLimitExceeded(3)));
        assert_eq!(source.fetched().len(), 3);
        assert_eq!(db.list_movies().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_run_fetches_nothing() {
        let source = FakeSource::default().with_page(ROOT, vec![film(1, "Film")], None);
        let (engine, db, source) = engine(source).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.run_until_cancelled(&cancel).await.unwrap_err();

        assert!(matches!(err, CoreError::Cancelled));
        assert!(source.fetched().is_empty());
        assert!(db.list_movies().await.unwrap().is_empty());
        assert_eq!(engine.state(), SyncState::Cancelled);
    }

    /// Delegates to the database but stalls every create after the first `fast` ones
    struct StallingStore {
        db: Database,
        fast: usize,
        creates: Mutex<usize>,
    }

    #[async_trait]
    impl MovieStore for StallingStore {
        async fn find_movie_by_episode(&self, episode: i64) -> Result<Option<Movie>, DbError> {
            self.db.find_movie_by_episode(episode).await
        }

        async fn find_movie_by_id(&self, id: i64) -> Result<Option<Movie>, DbError> {
            self.db.find_movie_by_id(id).await
        }

        async fn list_movies(&self) -> Result<Vec<Movie>, DbError> {
            self.db.list_movies().await
        }

        async fn create_movie(&self, movie: NewMovie) -> Result<Movie, DbError> {
            let stall = {
                let mut creates = self.creates.lock();
                *creates += 1;
                *creates > self.fast
            };
            if stall {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.db.create_movie(movie).await
        }

        async fn update_movie(&self, movie: &Movie) -> Result<Movie, DbError> {
            self.db.update_movie(movie).await
        }

        async fn delete_movie(&self, movie: &Movie) -> Result<(), DbError> {
            self.db.delete_movie(movie).await
        }
    }

    #[tokio::test]
    async fn test_stalled_store_times_out_and_keeps_earlier_pages() {
        let source = FakeSource::default()
            .with_page(ROOT, vec![film(1, "The Phantom Menace")], Some(PAGE_2))
            .with_page(PAGE_2, vec![film(2, "Attack of the Clones")], None);
        let db = Database::in_memory().await.unwrap();
        let store = StallingStore {
            db: db.clone(),
            fast: 1,
            creates: Mutex::new(0),
        };
        let engine = SyncEngine::new(
            Arc::new(store),
            Arc::new(source),
            SyncConfig {
                root_url: ROOT.to_string(),
                store_timeout: Duration::from_millis(50),
                ..SyncConfig::default()
            },
        );

        let started = Instant::now();
        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, CoreError::Timeout(_)));
        assert!(err.is_retryable());
        assert!(!err.is_upstream());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(engine.state(), SyncState::Failed);

        let movies = db.list_movies().await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].episode_number, 1);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(CoreError::Timeout("movie store find".to_string()).is_retryable());
        assert!(
            CoreError::Proxy(ProxyError::UpstreamError {
                status: 503,
                message: "unavailable".to_string(),
            })
            .is_retryable()
        );
        assert!(!CoreError::PaginationCycle(ROOT.to_string()).is_retryable());
        assert!(!CoreError::Cancelled.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_root_url() {
        let db = Database::in_memory().await.unwrap();
        let engine = SyncEngine::new(
            Arc::new(db),
            Arc::new(FakeSource::default()),
            SyncConfig {
                root_url: "not a url".to_string(),
                ..SyncConfig::default()
            },
        );

        assert!(matches!(engine.run().await, Err(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_normalize_trims_fields() {
        let movie = normalize(FilmRecord {
            episode_number: 6,
            title: "  Return of the Jedi ".to_string(),
            director: Some(" Richard Marquand".to_string()),
            release_date: Some(String::new()),
            description: None,
        });

        assert_eq!(movie.title, "Return of the Jedi");
        assert_eq!(movie.director.as_deref(), Some("Richard Marquand"));
        assert_eq!(movie.release_date, None);
    }
}
