mod error;
mod filter;
mod health;
mod metrics;

use anyhow::{Context as _, Result};
use profile_core::{
    config::CommunityConfig,
    http::HttpFactory,
    logging,
    metrics::{HttpMetrics, SyncMetrics},
    profile_resolver::OnchainProfileResolver,
    profile_store::PostgrestProfileStore,
    sync::ProfileSync,
};
use prometheus::Registry;
use std::{
    convert::Infallible, fmt, net::SocketAddr, num::ParseIntError, path::PathBuf, str::FromStr,
    sync::Arc, time::Duration,
};
use structopt::StructOpt;
use url::Url;

#[derive(Debug, StructOpt)]
#[structopt(name = "profile sync", rename_all = "kebab")]
struct Options {
    /// The log filter to use, following the `env_logger` syntax.
    #[structopt(
        long,
        env = "PROFILE_SYNC_LOG",
        default_value = "warn,profile_sync=info,profile_core=info"
    )]
    log_filter: String,

    /// The address the notification endpoint listens on.
    #[structopt(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    bind_address: SocketAddr,

    /// Path to the community configuration describing the profile registry,
    /// its chain and the IPFS gateway profiles are published to.
    #[structopt(
        long,
        env = "COMMUNITY_CONFIG",
        default_value = "community.json",
        parse(from_os_str)
    )]
    community_config: PathBuf,

    /// The base URL of the Supabase project storing profiles.
    #[structopt(long, env = "SUPABASE_URL")]
    supabase_url: Url,

    /// The service role key used to write to the profiles table.
    #[structopt(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_service_role_key: ServiceRoleKey,

    /// The table synchronized profiles are written to.
    #[structopt(long, env = "PROFILES_TABLE", default_value = "Profiles")]
    profiles_table: String,

    /// The columns of the profiles table. Every upsert writes all of them,
    /// resetting the columns a profile does not carry to their defaults.
    #[structopt(
        long,
        env = "PROFILE_COLUMNS",
        default_value = "account,username,name,description,image,image_medium,image_small,token_id",
        use_delimiter = true
    )]
    profile_columns: Vec<String>,

    /// The timeout in seconds of outgoing HTTP requests.
    #[structopt(
        long,
        env = "HTTP_TIMEOUT",
        default_value = "10",
        parse(try_from_str = duration_secs),
    )]
    http_timeout: Duration,
}

/// Keeps the service role key out of the logged options.
struct ServiceRoleKey(String);

impl FromStr for ServiceRoleKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ServiceRoleKey(s.to_owned()))
    }
}

impl fmt::Debug for ServiceRoleKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::from_args();
    let (_, _guard) = logging::init(&options.log_filter);
    log::info!("Starting profile sync with runtime options: {:#?}", options);

    let config = CommunityConfig::load(&options.community_config)?;
    log::info!(
        "Synchronizing profiles of registry {}",
        config.profile_address()
    );

    let registry = Arc::new(Registry::new());
    let http_factory = HttpFactory::new(options.http_timeout, HttpMetrics::new(&registry)?);
    let resolver = OnchainProfileResolver::new(&http_factory, &config)
        .context("failed to create profile resolver")?;
    let store = PostgrestProfileStore::new(
        &http_factory,
        &options.supabase_url,
        options.profiles_table,
        &options.profile_columns,
        options.supabase_service_role_key.0,
    )
    .context("failed to create profile store")?;

    let sync = Arc::new(ProfileSync::new(
        config.profile_address(),
        Arc::new(resolver),
        Arc::new(store),
        Arc::new(SyncMetrics::new(&registry)?),
    ));
    let metrics = Arc::new(metrics::Metrics::new(&registry)?);

    log::info!("Serving profile notifications on {}", options.bind_address);
    warp::serve(filter::all(sync, registry, metrics))
        .run(options.bind_address)
        .await;
    Ok(())
}

fn duration_secs(s: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_secs(s.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use profile_core::profile_store::DEFAULT_PROFILE_COLUMNS;

    #[test]
    fn parses_options_with_defaults() {
        let options = Options::from_iter_safe(&[
            "profile-sync",
            "--supabase-url",
            "https://project.supabase.co",
            "--supabase-service-role-key",
            "secret",
        ])
        .unwrap();

        assert_eq!(options.bind_address, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(options.community_config, PathBuf::from("community.json"));
        assert_eq!(options.profiles_table, "Profiles");
        assert_eq!(options.profile_columns, DEFAULT_PROFILE_COLUMNS);
        assert_eq!(options.http_timeout, Duration::from_secs(10));
        assert!(!format!("{:?}", options).contains("secret"));
    }

    #[test]
    fn parses_timeout_seconds() {
        assert_eq!(duration_secs("30").unwrap(), Duration::from_secs(30));
        assert!(duration_secs("1.5").is_err());
    }
}
