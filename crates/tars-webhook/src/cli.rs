use clap::builder::PossibleValue;
use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    let mut args = vec![
        Arg::new("log-level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .env("TARS_WEBHOOK_LOG_LEVEL")
            .default_value("info")
            .value_parser([
                PossibleValue::new("trace"),
                PossibleValue::new("debug"),
                PossibleValue::new("info"),
                PossibleValue::new("warn"),
                PossibleValue::new("error"),
            ])
            .help("Log level"),
        Arg::new("log-fmt")
            .long("log-fmt")
            .value_name("LOG_FMT")
            .env("TARS_WEBHOOK_LOG_FMT")
            .default_value("text")
            .value_parser([PossibleValue::new("text"), PossibleValue::new("json")])
            .help("Log output format"),
        Arg::new("log-no-color")
            .long("log-no-color")
            .env("NO_COLOR")
            .action(ArgAction::SetTrue)
            .help("Disable colored output for logs"),
        Arg::new("address")
            .long("addr")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .env("TARS_WEBHOOK_BIND_ADDRESS")
            .help("Bind against ADDRESS"),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .default_value("443")
            .env("TARS_WEBHOOK_PORT")
            .help("Listen on PORT"),
        Arg::new("cert-file")
            .long("cert-file")
            .value_name("CERT_FILE")
            .default_value("/etc/tarswebhook-cert/ca.crt")
            .env("TARS_WEBHOOK_CERT_FILE")
            .help("Path to an X.509 certificate file for HTTPS, empty to serve plain HTTP"),
        Arg::new("key-file")
            .long("key-file")
            .value_name("KEY_FILE")
            .default_value("/etc/tarswebhook-cert/ca.key")
            .env("TARS_WEBHOOK_KEY_FILE")
            .help("Path to an X.509 private key file for HTTPS, empty to serve plain HTTP"),
        Arg::new("controller-username")
            .long("controller-username")
            .value_name("USERNAME")
            .default_value(tars_admission::constants::DEFAULT_CONTROLLER_SERVICE_ACCOUNT)
            .env("TARS_WEBHOOK_CONTROLLER_USERNAME")
            .help("Account the tars controller runs as. Only this account can create the workloads derived from a TServer"),
        Arg::new("watch-namespace")
            .long("watch-namespace")
            .value_name("NAMESPACE")
            .env("TARS_WEBHOOK_WATCH_NAMESPACE")
            .required(false)
            .help("Only watch the Tars resources of NAMESPACE. All the namespaces are watched when not set"),
        Arg::new("workers")
            .long("workers")
            .value_name("WORKERS_NUMBER")
            .env("TARS_WEBHOOK_WORKERS")
            .help("Maximum number of reviews evaluated at the same time, defaults to the number of CPUs"),
        Arg::new("read-timeout-seconds")
            .long("read-timeout-seconds")
            .value_name("SECONDS")
            .default_value("5")
            .env("TARS_WEBHOOK_READ_TIMEOUT_SECONDS")
            .help("Abort requests whose body is not received within the given time"),
        Arg::new("write-timeout-seconds")
            .long("write-timeout-seconds")
            .value_name("SECONDS")
            .default_value("12")
            .env("TARS_WEBHOOK_WRITE_TIMEOUT_SECONDS")
            .help("Abort requests not answered within the given time"),
        Arg::new("ignore-kubernetes-connection-failure")
            .long("ignore-kubernetes-connection-failure")
            .env("TARS_WEBHOOK_IGNORE_KUBERNETES_CONNECTION_FAILURE")
            .action(ArgAction::SetTrue)
            .help("Do not exit with an error if the Kubernetes connection fails. Every review that needs the cluster state is rejected as not ready"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .args(args)
}
