use serde_json::Value;
use tracing::{debug, info};

use crate::clients::client_model::{ClientRecord, ClientRef, NewClient};
use crate::upload::transport::Transport;
use crate::workflow::error::IntakeError;

pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

/// One page of the client table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPage<'a> {
    /// 1-based page number actually shown
    pub page: usize,
    pub total_pages: usize,
    pub rows: &'a [ClientRecord],
}

impl ClientPage<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Talks to the clients list and create endpoints.
pub struct ClientDirectory<'a> {
    transport: &'a dyn Transport,
    list_url: &'a str,
    create_url: &'a str,
}

impl<'a> ClientDirectory<'a> {
    pub fn new(transport: &'a dyn Transport, list_url: &'a str, create_url: &'a str) -> Self {
        Self {
            transport,
            list_url,
            create_url,
        }
    }

    pub fn fetch_clients(&self) -> Result<Vec<ClientRecord>, IntakeError> {
        let response = self.transport.get(self.list_url)?;
        if !response.is_success() {
            return Err(IntakeError::HttpStatus {
                url: self.list_url.to_string(),
                status: response.status,
                message: "Failed to load data".to_string(),
            });
        }

        // A null body is an empty directory, not an error
        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| IntakeError::json("clients list", e))?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        let clients: Vec<ClientRecord> =
            serde_json::from_value(body).map_err(|e| IntakeError::json("clients list", e))?;

        debug!(count = clients.len(), "fetched clients");
        Ok(clients)
    }

    /// Resolve a client id to the reference attached to staged files.
    pub fn find_client(&self, id: &str) -> Result<ClientRef, IntakeError> {
        self.fetch_clients()?
            .iter()
            .find(|c| c.id == id)
            .map(ClientRecord::to_ref)
            .ok_or_else(|| IntakeError::MissingInput(format!("no client with id {}", id)))
    }

    /// Create a client. Both values are trimmed and must be non-empty.
    pub fn create_client(&self, company_name: &str, commission: &str) -> Result<(), IntakeError> {
        let company_name = company_name.trim();
        let commission = commission.trim();
        if company_name.is_empty() || commission.is_empty() {
            return Err(IntakeError::MissingInput(
                "company name and commission are required".to_string(),
            ));
        }

        let body = serde_json::to_value(NewClient {
            company_name: company_name.to_string(),
            commission: commission.to_string(),
        })
        .map_err(|e| IntakeError::json("new client", e))?;

        let response = self.transport.post_json(self.create_url, &body)?;
        if !response.is_success() {
            return Err(IntakeError::HttpStatus {
                url: self.create_url.to_string(),
                status: response.status,
                message: format!("HTTP error: {}", response.status),
            });
        }

        info!(company_name, "client created");
        Ok(())
    }
}

/// Case-insensitive substring match on the client name.
pub fn search<'a>(clients: &'a [ClientRecord], term: &str) -> Vec<&'a ClientRecord> {
    let needle = term.trim().to_lowercase();
    clients
        .iter()
        .filter(|c| needle.is_empty() || c.clientname.to_lowercase().contains(&needle))
        .collect()
}

/// Slice out page `page` (1-based) of `rows`.
pub fn paginate<T>(rows: &[T], page: usize, rows_per_page: usize) -> (usize, &[T]) {
    let rows_per_page = rows_per_page.max(1);
    let total_pages = rows.len().div_ceil(rows_per_page);
    let start = page.saturating_sub(1).saturating_mul(rows_per_page);
    if start >= rows.len() {
        return (total_pages, &[]);
    }
    let end = (start + rows_per_page).min(rows.len());
    (total_pages, &rows[start..end])
}

pub fn client_page(clients: &[ClientRecord], page: usize, rows_per_page: usize) -> ClientPage<'_> {
    let (total_pages, rows) = paginate(clients, page, rows_per_page);
    ClientPage {
        page: page.max(1),
        total_pages,
        rows,
    }
}
