//! Company-registry lookup (CNPJ enrichment)
//!
//! Queries BrasilAPI first and falls back to the public CNPJ.ws endpoint,
//! extracting just what the form needs: legal name, city, state and postal
//! code. Both sources being down is not an error the user has to deal with;
//! the caller keeps whatever was typed manually.
//!
//! The lookup is fired whenever the CNPJ becomes checksum-valid, so a slow
//! response can arrive after the user has already edited the field again.
//! [`EnrichmentSession`] guards against that: each lookup takes a
//! generation-stamped guard, and only the most recently started lookup is
//! allowed to apply its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::documents::{format_cep, only_digits};
use crate::models::Company;

const BRASILAPI_URL: &str = "https://brasilapi.com.br/api/cnpj/v1";
const CNPJ_WS_URL: &str = "https://publica.cnpj.ws/cnpj";

/// What a registry lookup can tell us about a company. Absent fields stay
/// `None`; the enrichment rules in [`Company::apply_registry_info`] decide
/// what actually lands in the record.
#[derive(Debug, Clone, Default)]
pub struct RegistryInfo {
    pub legal_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("a CNPJ must have 14 digits")]
    InvalidCnpj,

    #[error("company registry unavailable")]
    Unavailable,
}

/// BrasilAPI CNPJ payload (the fields we use).
#[derive(Debug, Deserialize)]
struct BrasilApiCnpj {
    razao_social: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    // the CEP comes back as a string or a bare number depending on the record
    cep: Option<serde_json::Value>,
}

/// CNPJ.ws payload (nested establishment data).
#[derive(Debug, Deserialize)]
struct CnpjWsResponse {
    razao_social: Option<String>,
    estabelecimento: Option<CnpjWsEstabelecimento>,
}

#[derive(Debug, Deserialize)]
struct CnpjWsEstabelecimento {
    cidade: Option<CnpjWsCidade>,
    estado: Option<CnpjWsEstado>,
    cep: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CnpjWsCidade {
    nome: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CnpjWsEstado {
    sigla: Option<String>,
}

/// HTTP client over the two public registry endpoints.
#[derive(Debug, Clone, Default)]
pub struct RegistryClient {
    client: Client,
}

impl RegistryClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Look a CNPJ up, trying BrasilAPI then CNPJ.ws. The input may be
    /// masked; anything that does not strip to 14 digits is refused before
    /// any network traffic.
    pub async fn lookup(&self, cnpj: &str) -> Result<RegistryInfo, RegistryError> {
        let digits = only_digits(cnpj);
        if digits.len() != 14 {
            return Err(RegistryError::InvalidCnpj);
        }

        if let Some(info) = self.try_brasilapi(&digits).await {
            return Ok(info);
        }
        if let Some(info) = self.try_cnpj_ws(&digits).await {
            return Ok(info);
        }

        Err(RegistryError::Unavailable)
    }

    async fn try_brasilapi(&self, cnpj: &str) -> Option<RegistryInfo> {
        let url = format!("{BRASILAPI_URL}/{cnpj}");
        debug!("querying {}", url);

        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            warn!("brasilapi returned {} for CNPJ {}", response.status(), cnpj);
            return None;
        }
        let body: BrasilApiCnpj = response.json().await.ok()?;

        Some(RegistryInfo {
            legal_name: body.razao_social,
            city: body.municipio,
            state: body.uf,
            postal_code: cep_from_value(body.cep),
        })
    }

    async fn try_cnpj_ws(&self, cnpj: &str) -> Option<RegistryInfo> {
        let url = format!("{CNPJ_WS_URL}/{cnpj}");
        debug!("querying {}", url);

        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            warn!("cnpj.ws returned {} for CNPJ {}", response.status(), cnpj);
            return None;
        }
        let body: CnpjWsResponse = response.json().await.ok()?;
        let establishment = body.estabelecimento;

        Some(RegistryInfo {
            legal_name: body.razao_social,
            city: establishment
                .as_ref()
                .and_then(|e| e.cidade.as_ref())
                .and_then(|c| c.nome.clone()),
            state: establishment
                .as_ref()
                .and_then(|e| e.estado.as_ref())
                .and_then(|s| s.sigla.clone()),
            postal_code: cep_from_value(establishment.and_then(|e| e.cep)),
        })
    }
}

/// The registries ship the CEP as either `"01310100"` or `1310100`; format
/// whatever arrives, dropping values that are not 8 digits.
fn cep_from_value(value: Option<serde_json::Value>) -> Option<String> {
    let raw = match value? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => {
            // numeric CEPs lose their leading zero
            format!("{:08}", n.as_u64()?)
        }
        _ => return None,
    };
    format_cep(&raw)
}

/// Generation counter over enrichment lookups. Starting a new lookup
/// invalidates every guard handed out before it, which is what stops a slow
/// stale response from overwriting newer user edits.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentSession {
    generation: Arc<AtomicU64>,
}

/// Handle for one in-flight lookup, stamped with the generation it started
/// at.
#[derive(Debug)]
pub struct EnrichmentGuard {
    generation: Arc<AtomicU64>,
    started_at: u64,
}

impl EnrichmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lookup, invalidating any earlier in-flight one.
    pub fn begin(&self) -> EnrichmentGuard {
        let started_at = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        EnrichmentGuard {
            generation: Arc::clone(&self.generation),
            started_at,
        }
    }
}

impl EnrichmentGuard {
    /// True while no newer lookup has started.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.started_at
    }

    /// Apply the lookup result to the company unless this lookup has been
    /// superseded. Returns whether it applied.
    pub fn apply(&self, company: &mut Company, info: &RegistryInfo) -> bool {
        if !self.is_current() {
            debug!("discarding stale registry lookup result");
            return false;
        }
        company.apply_registry_info(info);
        true
    }
}
