//! CLI runner - executes commands

use crate::auth::{Anonymous, Auth, Token};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::{Body, Client, ParamValue, QueryParams, RequestConfig};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::pagination::PageItem;
use crate::types::{JsonValue, MediaType};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = self.build_client()?;

        match &self.cli.command {
            Commands::Get {
                url,
                params,
                accept,
            } => {
                let request = build_request(params, accept.as_deref());
                let response = client.get_with_config(url, request).await?;
                self.output_body(&response.body);
                Ok(())
            }
            Commands::Paginate {
                url,
                params,
                accept,
                limit,
            } => {
                let request = build_request(params, accept.as_deref());
                self.paginate(&client, url, request, *limit).await
            }
            Commands::RateLimit => self.rate_limit(&client).await,
        }
    }

    /// Load the configuration and build a client
    fn build_client(&self) -> Result<Client> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        if let Some(base_url) = &self.cli.base_url {
            config.base_url.clone_from(base_url);
        }

        let auth: Arc<dyn Auth> = match self.cli.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Arc::new(Token::new(token)?),
            None => {
                info!("No token given, making unauthenticated requests");
                Arc::new(Anonymous)
            }
        };

        debug!("Using API root {}", config.base_url);
        Client::new(config, auth)
    }

    async fn paginate(
        &self,
        client: &Client,
        url: &str,
        request: RequestConfig,
        limit: Option<usize>,
    ) -> Result<()> {
        let mut pages = client.paginate(url, request);
        let mut count = 0usize;

        while limit.map_or(true, |max| count < max) {
            let Some(item) = pages.next().await else {
                break;
            };
            match item? {
                PageItem::Element(value) => self.output_value(&value),
                PageItem::Raw(text) => println!("{text}"),
            }
            count += 1;
        }

        info!(
            "Printed {} items from {} pages{}",
            count,
            pages.pages_fetched(),
            pages
                .total_count()
                .map(|total| format!(" (total_count {total})"))
                .unwrap_or_default()
        );
        Ok(())
    }

    async fn rate_limit(&self, client: &Client) -> Result<()> {
        client.get("/rate_limit").await?;
        let (remaining, limit) = client.rate_limiting();
        self.output_value(&json!({
            "remaining": remaining,
            "limit": limit,
            "reset": client.rate_limiting_resettime(),
        }));
        Ok(())
    }

    fn output_body(&self, body: &Body) {
        match body {
            Body::Json(value) => self.output_value(value),
            Body::Raw(text) => println!("{text}"),
            Body::Empty => {}
        }
    }

    fn output_value(&self, value: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

/// Build a request from `key=value` pairs and an `--accept` value
///
/// Repeated keys become a multi-valued parameter.
fn build_request(pairs: &[(String, String)], accept: Option<&str>) -> RequestConfig {
    let mut params = QueryParams::new();
    for (key, value) in pairs {
        let merged = match params.remove(key) {
            None => ParamValue::Single(value.clone()),
            Some(ParamValue::Single(first)) => ParamValue::Multi(vec![first, value.clone()]),
            Some(ParamValue::Multi(mut values)) => {
                values.push(value.clone());
                ParamValue::Multi(values)
            }
        };
        params.insert(key.clone(), merged);
    }

    let mut request = RequestConfig::new().params(params);
    if let Some(accept) = accept {
        let media = accept
            .parse::<MediaType>()
            .map_or_else(|_| accept.to_string(), |m| m.as_str().to_string());
        request = request.header("Accept", media);
    }
    request
}
