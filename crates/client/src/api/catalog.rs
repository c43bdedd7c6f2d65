//! Branch, category and menu endpoints.

use peelojuice_core::JuiceId;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{Branch, Category, Juice, ListResponse, MenuQuery};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// List active branches. Cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn branches(&self) -> Result<Vec<Branch>, ApiError> {
        if let Some(CacheValue::Branches(branches)) = self.inner.cache.get(&CacheKey::Branches).await
        {
            debug!("Cache hit for branches");
            return Ok(branches);
        }

        let response: ListResponse<Branch> = self
            .execute(ApiRequest::get("/products/branches/"))
            .await?;
        let branches = response.into_vec();

        self.inner
            .cache
            .insert(CacheKey::Branches, CacheValue::Branches(branches.clone()))
            .await;

        Ok(branches)
    }

    /// List menu categories. Cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let response: ListResponse<Category> = self
            .execute(ApiRequest::get("/products/categories/"))
            .await?;
        let categories = response.into_vec();

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// List the menu, scoped to a branch when one is given. Cached per query.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn menu(&self, query: MenuQuery) -> Result<Vec<Juice>, ApiError> {
        let key = CacheKey::Menu(query);
        if let Some(CacheValue::Menu(juices)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for menu");
            return Ok(juices);
        }

        let mut request = match query.branch {
            Some(branch) => ApiRequest::get(format!("/products/branches/{branch}/products/")),
            None => ApiRequest::get("/products/juices/"),
        };
        if let Some(category) = query.category {
            request = request.query("category", category);
        }

        let response: ListResponse<Juice> = self.execute(request).await?;
        let juices = response.into_vec();

        self.inner
            .cache
            .insert(key, CacheValue::Menu(juices.clone()))
            .await;

        Ok(juices)
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(juice = %id))]
    pub async fn juice(&self, id: JuiceId) -> Result<Juice, ApiError> {
        self.execute(ApiRequest::get(format!("/products/juices/{id}/")))
            .await
    }
}
