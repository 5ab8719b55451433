use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::errors::CoreError;
use crate::models::position::{
    ImportRecord, NewPersistedPosition, PersistedPosition, PersistedPositionUpdate,
};
use crate::providers::traits::PositionStore;

const POSITIONS: &str = "/portfolio/positions";

/// The user's saved positions, behind the authenticated `/portfolio` routes.
pub struct PortfolioApi {
    client: Arc<ApiClient>,
}

#[derive(Serialize)]
struct ImportBody<'a> {
    positions: &'a [ImportRecord],
}

impl PortfolioApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PositionStore for PortfolioApi {
    async fn list_positions(&self) -> Result<Vec<PersistedPosition>, CoreError> {
        self.client.get(POSITIONS).await
    }

    async fn get_position(&self, id: i64) -> Result<PersistedPosition, CoreError> {
        self.client.get(&format!("{POSITIONS}/{id}")).await
    }

    async fn create_position(
        &self,
        position: &NewPersistedPosition,
    ) -> Result<PersistedPosition, CoreError> {
        self.client.post(POSITIONS, position).await
    }

    async fn update_position(
        &self,
        id: i64,
        update: &PersistedPositionUpdate,
    ) -> Result<PersistedPosition, CoreError> {
        self.client.put(&format!("{POSITIONS}/{id}"), update).await
    }

    async fn delete_position(&self, id: i64) -> Result<(), CoreError> {
        self.client.delete(&format!("{POSITIONS}/{id}")).await
    }

    async fn import_positions(
        &self,
        records: &[ImportRecord],
    ) -> Result<Vec<PersistedPosition>, CoreError> {
        self.client
            .post("/portfolio/import", &ImportBody { positions: records })
            .await
    }

    async fn export_positions(&self) -> Result<Vec<ImportRecord>, CoreError> {
        self.client.get("/portfolio/export").await
    }
}
