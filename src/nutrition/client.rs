//! FoodData Central lookup: free-text search, then per-food nutrient detail.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::extract::{NutrientAmount, NutrientProfile};
use crate::config::UsdaConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodCandidate {
    #[serde(rename = "fdcId")]
    pub fdc_id: u64,
    pub description: String,
}

#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// Candidates for a food label. No match is `Ok(vec![])`.
    async fn search(&self, label: &str) -> Result<Vec<FoodCandidate>, AppError>;

    async fn fetch_detail(&self, fdc_id: u64) -> Result<NutrientProfile, AppError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<FoodCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailResponse {
    #[serde(default)]
    food_nutrients: Vec<FoodNutrientResponse>,
}

#[derive(Debug, Deserialize)]
struct FoodNutrientResponse {
    nutrient: Option<NutrientInfo>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NutrientInfo {
    name: String,
    unit_name: String,
}

pub struct UsdaClient {
    config: UsdaConfig,
    http: reqwest::Client,
}

impl UsdaClient {
    pub fn new(config: UsdaConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("build usda http client")?;
        Ok(Self { config, http })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, %url, "usda request failed");
                AppError::lookup(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, %url, "usda returned non-success");
            return Err(AppError::lookup(format!("HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::lookup(format!("unreadable response: {e}")))
    }
}

#[async_trait]
impl NutritionLookup for UsdaClient {
    async fn search(&self, label: &str) -> Result<Vec<FoodCandidate>, AppError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::validation("search query cannot be empty"));
        }
        let url = format!("{}/foods/search", self.config.base_url);
        let body: SearchResponse = self
            .get_json(
                &url,
                &[
                    ("query", label.to_string()),
                    ("api_key", self.config.api_key.clone()),
                    ("pageNumber", self.config.page_number.to_string()),
                    ("pageSize", self.config.page_size.to_string()),
                ],
            )
            .await?;
        debug!(%label, found = body.foods.len(), "usda search");
        Ok(body.foods)
    }

    async fn fetch_detail(&self, fdc_id: u64) -> Result<NutrientProfile, AppError> {
        let url = format!("{}/food/{fdc_id}", self.config.base_url);
        let body: DetailResponse = self
            .get_json(&url, &[("api_key", self.config.api_key.clone())])
            .await?;

        let nutrients = body
            .food_nutrients
            .into_iter()
            .filter_map(|n| {
                let info = n.nutrient?;
                Some(NutrientAmount {
                    name: info.name,
                    unit_name: info.unit_name,
                    amount: n.amount.unwrap_or(0.0),
                })
            })
            .collect();
        Ok(NutrientProfile { nutrients })
    }
}
