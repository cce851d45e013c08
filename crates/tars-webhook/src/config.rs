use anyhow::{anyhow, Result};
use clap::ArgMatches;
use lazy_static::lazy_static;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

pub struct Config {
    pub addr: SocketAddr,
    pub tls_config: Option<TlsConfig>,
    pub controller_username: String,
    pub watch_namespace: Option<String>,
    pub ignore_kubernetes_connection_failure: bool,
    pub workers: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;
        let tls_config = tls_config(matches)?;

        let controller_username = string_arg(matches, "controller-username")?;
        let watch_namespace = matches
            .get_one::<String>("watch-namespace")
            .filter(|namespace| !namespace.is_empty())
            .cloned();
        let ignore_kubernetes_connection_failure =
            flag(matches, "ignore-kubernetes-connection-failure");

        let workers = match matches.get_one::<String>("workers") {
            Some(workers) => workers
                .parse::<usize>()
                .map_err(|e| anyhow!("error parsing the number of workers: {}", e))?,
            None => num_cpus::get(),
        };
        if workers == 0 {
            return Err(anyhow!("error parsing arguments: --workers must be greater than 0"));
        }

        let read_timeout = seconds(matches, "read-timeout-seconds")?;
        let write_timeout = seconds(matches, "write-timeout-seconds")?;

        Ok(Self {
            addr,
            tls_config,
            controller_username,
            watch_namespace,
            ignore_kubernetes_connection_failure,
            workers,
            read_timeout,
            write_timeout,
            log_level: string_arg(matches, "log-level")?,
            log_fmt: string_arg(matches, "log-fmt")?,
            log_no_color: flag(matches, "log-no-color"),
        })
    }
}

fn string_arg(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .ok_or_else(|| anyhow!("error parsing arguments: --{} is missing", id))
}

fn flag(matches: &ArgMatches, id: &str) -> bool {
    matches.get_one::<bool>(id).copied().unwrap_or_default()
}

fn seconds(matches: &ArgMatches, id: &str) -> Result<Duration> {
    string_arg(matches, id)?
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| anyhow!("error parsing --{}: {}", id, e))
}

fn api_bind_address(matches: &ArgMatches) -> Result<SocketAddr> {
    format!(
        "{}:{}",
        string_arg(matches, "address")?,
        string_arg(matches, "port")?
    )
    .parse()
    .map_err(|e| anyhow!("error parsing arguments: {}", e))
}

fn tls_config(matches: &ArgMatches) -> Result<Option<TlsConfig>> {
    let cert_file = string_arg(matches, "cert-file")?;
    let key_file = string_arg(matches, "key-file")?;
    match (cert_file.is_empty(), key_file.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some(TlsConfig {
            cert_file: PathBuf::from(cert_file),
            key_file: PathBuf::from(key_file),
        })),
        _ => Err(anyhow!(
            "error parsing arguments: either both --cert-file and --key-file must be provided, or neither"
        )),
    }
}
