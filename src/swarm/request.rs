use crate::swarm::{error::Error, Config, Result};
use http::header::ACCEPT;
use http::StatusCode;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

pub(super) async fn get<R: DeserializeOwned>(
    http_client: &reqwest::Client,
    config: &Config,
    path: &str,
    params: HashMap<String, String>,
) -> Result<R> {
    let url = gen_url(config, path, &params)?;
    let response = http_client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let body = check_response(path, response).await?;

    serde_json::from_slice(&body).map_err(|e| Error::Deserialization {
        content: path.to_owned(),
        source: e,
    })
}

pub(super) async fn post<T: Serialize>(
    http_client: &reqwest::Client,
    config: &Config,
    path: &str,
    content: &T,
    params: HashMap<String, String>,
) -> Result<()> {
    let url = gen_url(config, path, &params)?;
    let response = http_client
        .post(url)
        .header(ACCEPT, "application/json")
        .json(content)
        .send()
        .await?;

    check_response(path, response).await?;

    Ok(())
}

pub(super) async fn delete(
    http_client: &reqwest::Client,
    config: &Config,
    path: &str,
    params: HashMap<String, String>,
) -> Result<()> {
    let url = gen_url(config, path, &params)?;
    let response = http_client
        .delete(url)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    check_response(path, response).await?;

    Ok(())
}

pub(super) fn gen_url(
    config: &Config,
    path: &str,
    params: &HashMap<String, String>,
) -> Result<Url> {
    let url = format!("{}/{}{}", config.address, config.api_version, path);
    Url::parse_with_params(&url, params.iter()).map_err(|e| Error::InvalidUrl {
        source: e,
        params: params.clone(),
        url,
    })
}

async fn check_response(path: &str, response: reqwest::Response) -> Result<Vec<u8>> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(path.to_owned()));
    }

    if !status.is_success() {
        return Err(Error::BadResponse {
            status,
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}
