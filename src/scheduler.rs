//! The polling loop: one collector run per endpoint, on a fixed interval,
//! for the life of the process.

use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::info;

use crate::collector;
use crate::config::{Config, ConfigError};
use crate::store::MetricStore;

/// Runs every endpoint's collector once, each on its own thread, and waits
/// for all of them.
///
/// Endpoint outcomes are independent: a slow or failing endpoint delays the
/// end of the cycle, never another endpoint's poll. Ordering across
/// endpoints is unspecified.
pub fn run_cycle(client: &Client, config: &Config, store: &MetricStore) {
    thread::scope(|scope| {
        for endpoint in &config.urls {
            scope.spawn(move || collector::collect(client, endpoint, store));
        }
    });
}

/// Loops forever: re-read the configuration, run one cycle, sleep.
///
/// The configuration file is re-read on every cycle so endpoints can be
/// added or removed without a restart; removed endpoints keep their stale
/// entry in the store. A read failure on any cycle terminates the loop,
/// and with it the process.
pub fn run(
    config_path: &Path,
    interval: Duration,
    client: &Client,
    store: &MetricStore,
) -> Result<(), ConfigError> {
    loop {
        let config = Config::from_file(config_path)?;
        info!(endpoints = config.urls.len(), "starting polling cycle");
        run_cycle(client, &config, store);
        thread::sleep(interval);
    }
}
