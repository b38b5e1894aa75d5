use crate::{
    cache,
    google::{CUSTOM_SEARCH_URL, MAPS_API_URL},
    models::LatLng,
    owners::bbb::BBB_URL,
    route::MAX_STOPS,
    util::parse_lat_lng,
};
use anyhow::{Error, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::log::LevelFilter;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use compact_str::CompactString;
use std::{io, path::PathBuf, time::Duration};
use tracing_subscriber::filter::LevelFilter as TFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Normal,
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// Log level verbosity
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Which log formatter to use
    // env will pick up the value if the field name is given as the key in uppercase
    #[arg(short = 'f', long, env, default_value_t, value_enum, global = true)]
    pub log_format: LogFormat,

    /// Directory for success_log.txt, failure_log.txt and error_log.txt
    #[arg(long, env = "BIZSCOUT_LOG_DIR", default_value = ".", global = true)]
    pub log_dir: PathBuf,

    #[command(flatten)]
    pub http: HttpArgs,

    /// Pipeline to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct HttpArgs {
    /// Timeout for each HTTP request
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration, global = true)]
    pub request_timeout: Duration,

    /// Load the response cache from this file at start, and save it back on exit
    #[arg(long, env = "BIZSCOUT_CACHE_FILE", global = true)]
    pub cache_file: Option<PathBuf>,

    /// How long to keep cached responses. Zero disables the cache.
    #[arg(long, default_value = "0s", value_parser = humantime::parse_duration, global = true)]
    pub cache_ttl: Duration,

    /// Max number of cached responses
    #[arg(long, default_value_t = 1000, global = true)]
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Search for businesses by keyword in each city, and save them to a spreadsheet
    Scrape {
        /// Output spreadsheet (.xlsx or .csv)
        #[arg(short, long, default_value = "HVAC_Plumbing_Businesses.xlsx")]
        output: PathBuf,

        /// City to search in. Repeat for more than one. Defaults to the Columbia, SC area.
        #[arg(short, long = "city")]
        cities: Vec<CompactString>,

        /// Kind of business to search for. Repeat for more than one.
        #[arg(short, long = "keyword")]
        keywords: Vec<CompactString>,

        /// Result pages to fetch per search, 20 results each
        #[arg(long, default_value_t = 1)]
        max_pages: usize,

        /// Pause after each place
        #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
        delay: Duration,

        /// Pause before fetching a follow-up result page
        #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
        page_delay: Duration,

        #[command(flatten)]
        maps: MapsArgs,
    },
    /// Look up the owner of each business on its website, by web search, and on BBB
    Owners {
        /// Spreadsheet from the scrape command
        #[arg(short, long, default_value = "HVAC_Plumbing_Businesses.xlsx")]
        input: PathBuf,

        /// Output spreadsheet, with owner columns added
        #[arg(short, long, default_value = "HVAC_Plumbing_Owners_Final.xlsx")]
        output: PathBuf,

        /// Custom search API key
        #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
        api_key: CompactString,

        /// Custom search engine id
        #[arg(long, env = "GOOGLE_CSE_ID")]
        cse_id: CompactString,

        /// Max number of businesses looked up at the same time. Unlimited if not set.
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Attempts per search before giving up
        #[arg(long, default_value_t = 5)]
        retries: usize,

        /// Initial wait after a quota error. Doubles on every retry.
        #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
        retry_delay: Duration,

        #[arg(long, default_value = CUSTOM_SEARCH_URL, hide = true)]
        search_url: CompactString,

        #[arg(long, default_value = BBB_URL, hide = true)]
        bbb_url: CompactString,
    },
    /// Plan an optimized driving route through the addresses in a spreadsheet
    Route {
        /// Spreadsheet with an Address column
        #[arg(short, long, default_value = "HVAC_Plumbing_Businesses.xlsx")]
        input: PathBuf,

        /// Where the route starts, e.g. your office address
        #[arg(short, long, env = "BIZSCOUT_START")]
        start: CompactString,

        /// Max number of stops
        #[arg(long, default_value_t = MAX_STOPS)]
        max_stops: usize,

        /// Leg summary
        #[arg(long, default_value = "Optimized_Route.csv")]
        csv: PathBuf,

        /// Interactive map
        #[arg(long, default_value = "Optimized_Route_Map.html")]
        map: PathBuf,

        /// Navigation link for phones
        #[arg(long, default_value = "Optimized_Route_Link.txt")]
        link: PathBuf,

        /// Map center as "lat,lng"
        #[arg(long, default_value = "34.0007,-81.0348", value_parser = parse_lat_lng)]
        center: LatLng,

        /// Initial map zoom level
        #[arg(long, default_value_t = 10)]
        zoom: u8,

        #[command(flatten)]
        maps: MapsArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct MapsArgs {
    /// Maps web services API key
    #[arg(long = "api-key", env = "GOOGLE_PLACES_API_KEY", hide_env_values = true)]
    pub key: CompactString,

    #[arg(long, default_value = MAPS_API_URL, hide = true)]
    pub maps_url: CompactString,
}

impl Cli {
    /// Wrapper for clap::Parser::try_parse_from
    pub fn try_parse_opts<I, T>(itr: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(itr).map_err(Error::from)
    }

    // this thin wrapper makes it possible to do the parsing without importing clap::Parser at the
    // call site
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Maps clap_verbosity_flag::LevelFilter values to tracing_subscriber::filter::LevelFilter
    /// values
    fn tracing_level_filter(&self) -> TFilter {
        match self.verbosity.log_level_filter() {
            LevelFilter::Off => TFilter::OFF,
            LevelFilter::Error => TFilter::ERROR,
            LevelFilter::Warn => TFilter::WARN,
            LevelFilter::Info => TFilter::INFO,
            LevelFilter::Debug => TFilter::DEBUG,
            LevelFilter::Trace => TFilter::TRACE,
        }
    }

    pub fn init_logger(&self) -> Result<()> {
        let layer = match self.log_format {
            LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().with_writer(io::stderr).boxed(),
            LogFormat::Compact => fmt::layer()
                .without_time()
                .compact()
                .with_writer(io::stderr)
                .boxed(),
            LogFormat::Normal => fmt::layer().with_writer(io::stderr).boxed(),
        };
        tracing_subscriber::registry()
            .with(
                EnvFilter::builder()
                    .with_default_directive(self.tracing_level_filter().into())
                    .from_env()?,
            )
            .with(layer)
            .init();
        Ok(())
    }

    pub fn cache_opts(&self) -> cache::Opts {
        cache::Opts {
            request_timeout: self.http.request_timeout,
            cache_ttl: self.http.cache_ttl,
            cache_capacity: self.http.cache_capacity,
            cache_path: self.http.cache_file.clone(),
        }
    }
}
