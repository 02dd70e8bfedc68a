use std::path::PathBuf;

use clap::Parser;

use crate::errors::{GenError, Result};
use crate::fetcher::Credentials;
use crate::generator::Target;

pub const ENDPOINT_VAR: &str = "ENDPOINT";
pub const TOKEN_VAR: &str = "TOKEN";
pub const TF_ENDPOINT_VAR: &str = "TF_VAR_utm_api_endpoint";
pub const TF_TOKEN_VAR: &str = "TF_VAR_utm_api_token";
pub const USER_VAR: &str = "TF_VAR_utm_api_user";
pub const PASSWORD_VAR: &str = "TF_VAR_utm_api_password";

/// Generates typed client sources from a live Sophos UTM REST API
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "utm2code")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the UTM, e.g. https://utm:4444 [env: ENDPOINT, TF_VAR_utm_api_endpoint]
    pub endpoint: Option<String>,

    /// API token [env: TOKEN, TF_VAR_utm_api_token]
    pub token: Option<String>,

    /// User for basic auth instead of a token [env: TF_VAR_utm_api_user]
    #[arg(long)]
    pub user: Option<String>,

    /// Password for basic auth [env: TF_VAR_utm_api_password]
    #[arg(long)]
    pub password: Option<String>,

    /// Directory the versioned `api/` tree is written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Language of the generated sources
    #[arg(short, long, value_enum, default_value_t = Target::Go)]
    pub target: Target,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Print every assembled endpoint as JSON
    #[arg(long)]
    pub debug: bool,
}

/// Everything a run needs, after command line and environment are merged
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub credentials: Credentials,
    pub output: PathBuf,
    pub target: Target,
    pub insecure: bool,
    pub debug: bool,
}

impl GeneratorConfig {
    /// Merges `cli` with the environment as seen through `env`.
    ///
    /// Command line values win, then the plain variables, then the `TF_VAR_`
    /// ones. Credentials are looked up in the order token argument, `--user`,
    /// token variables, user variable.
    pub fn resolve<F>(cli: Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let lookup =
            |value: Option<String>, var: &str| non_empty(value).or_else(|| non_empty(env(var)));

        let endpoint = lookup(cli.endpoint, ENDPOINT_VAR)
            .or_else(|| non_empty(env(TF_ENDPOINT_VAR)))
            .ok_or_else(|| {
                GenError::Config(format!(
                    "no endpoint given, pass ENDPOINT or set {ENDPOINT_VAR} or {TF_ENDPOINT_VAR}"
                ))
            })?;
        let endpoint = if endpoint.contains("://") {
            endpoint
        } else {
            format!("https://{endpoint}")
        };

        let basic = |user: String, password: Option<String>| {
            lookup(password, PASSWORD_VAR)
                .map(|password| Credentials::Basic { user, password })
                .ok_or_else(|| {
                    GenError::Config(format!(
                        "no password for basic auth, pass --password or set {PASSWORD_VAR}"
                    ))
                })
        };
        let credentials = if let Some(token) = non_empty(cli.token) {
            Credentials::Token(token)
        } else if let Some(user) = non_empty(cli.user) {
            basic(user, cli.password)?
        } else if let Some(token) =
            non_empty(env(TOKEN_VAR)).or_else(|| non_empty(env(TF_TOKEN_VAR)))
        {
            Credentials::Token(token)
        } else if let Some(user) = non_empty(env(USER_VAR)) {
            basic(user, cli.password)?
        } else {
            return Err(GenError::Config(format!(
                "no credentials given, pass TOKEN or --user, or set {TOKEN_VAR}, {TF_TOKEN_VAR} or {USER_VAR}"
            )));
        };

        Ok(Self {
            endpoint,
            credentials,
            output: cli.output,
            target: cli.target,
            insecure: cli.insecure,
            debug: cli.debug,
        })
    }
}
