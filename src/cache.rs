use crate::error::Result;
use http_cache_reqwest::{
    Cache, CacheMode, HttpCache, HttpCacheOptions, MokaCache, MokaCacheBuilder, MokaManager,
};
use reqwest::IntoUrl;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    collections::hash_map::RandomState,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, error, trace};

// Some of the scraped sites refuse anything that doesn't look like a browser
static APP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

type MCache = MokaCache<String, Arc<Vec<u8>>, RandomState>;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    value: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    store: Vec<CacheEntry>,
}

impl CacheFile {
    fn with_capacity(cap: usize) -> Self {
        Self {
            store: Vec::with_capacity(cap),
        }
    }

    /// Try to populate the given cache with contents of the given file.
    /// If it fails to load the file, an error will be logged, and the cache will be returned
    /// unmodified.
    async fn populate_cache<P: AsRef<Path>>(path: P, cap: usize, cache: MCache) -> MCache {
        let mut this = Self::with_capacity(cap);
        if let Err(err) = this.load(path) {
            error!(%err, "Failed to load cache file");
            return cache;
        }
        let cnt = this.store.len();
        for e in this.store {
            cache.insert(e.key, Arc::new(e.value)).await;
        }
        trace!("Loaded {} values into cache", cnt);
        cache
    }

    /// Consume the given cache and load its contents into the internal Vec, for saving to file.
    async fn from_cache(cache: MCache) -> Self {
        cache.run_pending_tasks().await;
        let mut this = Self::with_capacity(cache.entry_count() as usize);
        for (k, v) in cache.iter() {
            this.store.push(CacheEntry {
                key: (*k).clone(),
                value: (*v).clone(),
            });
        }
        trace!("Loaded {} values from cache", this.store.len());
        this
    }

    fn save<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let mut f = BufWriter::new(File::create(path)?);
        bincode::serde::encode_into_std_write(&self.store, &mut f, bincode::config::standard())?;
        f.flush()?;
        Ok(())
    }

    fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut f = BufReader::new(File::open(path)?);
        self.store = bincode::serde::decode_from_std_read(&mut f, bincode::config::standard())?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Opts {
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub cache_path: Option<PathBuf>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::ZERO,
            cache_capacity: 1000,
            cache_path: None,
        }
    }
}

impl Opts {
    fn cache_mode(&self) -> CacheMode {
        if self.cache_ttl.is_zero() {
            return CacheMode::NoStore;
        }
        // ForceCache works offline, and the TTL on the moka side takes care of eviction
        CacheMode::ForceCache
    }

    fn build_cache(&self) -> MCache {
        MokaCacheBuilder::new(self.cache_capacity as u64)
            .name("BizScoutCache")
            .time_to_live(self.cache_ttl.max(Duration::from_secs(1)))
            .build()
    }

    fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::ClientBuilder::new()
            .user_agent(APP_USER_AGENT)
            .timeout(self.request_timeout)
            .build()
    }
}

/// HTTP client shared by all scrapers and API clients. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    client: ClientWithMiddleware,
    cache: MCache,
    cache_path: Option<PathBuf>,
}

impl Client {
    pub async fn build(opts: Opts) -> reqwest::Result<Self> {
        // if a file path is set, try to populate the cache from the file,
        // otherwise create empty cache
        let cache = match opts.cache_path.as_ref() {
            Some(p) if !opts.cache_ttl.is_zero() => {
                CacheFile::populate_cache(p, opts.cache_capacity, opts.build_cache()).await
            }
            _ => opts.build_cache(),
        };
        Ok(Self {
            client: ClientBuilder::new(opts.build_client()?)
                .with(Cache(HttpCache {
                    mode: opts.cache_mode(),
                    manager: MokaManager::new(cache.clone()),
                    options: HttpCacheOptions::default(),
                }))
                .build(),
            cache,
            cache_path: opts.cache_path.filter(|_| !opts.cache_ttl.is_zero()),
        })
    }

    pub async fn save(self) -> Result<()> {
        match self.cache_path {
            Some(p) => CacheFile::from_cache(self.cache).await.save(p),
            None => {
                debug!("No cache file path set, unable to save");
                Ok(())
            }
        }
    }

    /// GET a page as text. Non-success statuses are errors.
    pub async fn get_as_string<U: IntoUrl>(&self, url: U) -> Result<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// GET a JSON API endpoint. The status is not checked, since the APIs we talk to describe
    /// their errors in the body.
    pub async fn get_json<T, U>(&self, url: U, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
        U: IntoUrl,
    {
        Ok(self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .json::<T>()
            .await?)
    }
}
