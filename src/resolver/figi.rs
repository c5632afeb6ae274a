// 🛰️ OpenFIGI mapping client (feature `openfigi`)

use super::lookup::{BatchLookup, LookupError, LookupMapping};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openfigi.com/v3/mapping";

#[derive(Debug, Serialize)]
struct MappingJob<'a> {
    #[serde(rename = "idType")]
    id_type: &'static str,
    #[serde(rename = "idValue")]
    id_value: &'a str,
}

#[derive(Debug, Deserialize)]
struct MappingResult {
    #[serde(default)]
    data: Vec<FigiInstrument>,
}

#[derive(Debug, Deserialize)]
struct FigiInstrument {
    ticker: Option<String>,
    name: Option<String>,
}

pub struct OpenFigiLookup {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenFigiLookup {
    pub fn new(api_key: Option<String>) -> Result<Self, LookupError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: Option<String>) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("disclosure-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        Ok(OpenFigiLookup {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl BatchLookup for OpenFigiLookup {
    fn lookup(&self, codes: &[String]) -> Result<HashMap<String, LookupMapping>, LookupError> {
        let jobs: Vec<MappingJob> = codes
            .iter()
            .map(|code| MappingJob {
                id_type: "ID_CUSIP",
                id_value: code,
            })
            .collect();

        let mut request = self.client.post(&self.endpoint).json(&jobs);
        if let Some(key) = &self.api_key {
            request = request.header("X-OPENFIGI-APIKEY", key);
        }

        let response = request
            .send()
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LookupError::Throttled {
                retry_after: retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            return Err(LookupError::Unavailable(format!("HTTP {}", status)));
        }

        let results: Vec<MappingResult> = response
            .json()
            .map_err(|e| LookupError::Unavailable(format!("bad mapping response: {}", e)))?;

        // Results come back in request order
        let mut mapped = HashMap::new();
        for (code, result) in codes.iter().zip(results) {
            let first = result.data.into_iter().find(|i| i.ticker.is_some());
            if let Some(FigiInstrument {
                ticker: Some(ticker),
                name,
            }) = first
            {
                mapped.insert(code.clone(), LookupMapping { symbol: ticker, name });
            }
        }

        Ok(mapped)
    }

    fn name(&self) -> &str {
        "openfigi"
    }
}
