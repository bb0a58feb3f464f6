//! Typed backend endpoints
//!
//! Thin wrappers that fix the path and payload types for each backend call.

use crate::gateway::{ApiGateway, RequestScope};
use crate::models::{
    AuthSession, Category, ContentPage, Customer, LoginRequest, Order, OrderRequest, OrderSummary,
    Page, PostSummary, Post, Product, ProductQuery, ProductSummary, RegisterRequest, ReturnRequest,
    ReturnSummary, SubscribeRequest, UpdateProfile,
};
use crate::{EgressError, Result};

/// Percent-encode a single path segment (RFC 3986 unreserved characters pass)
pub fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn require_token(scope: &RequestScope) -> Result<()> {
    if scope.token.is_none() {
        return Err(EgressError::Unauthorized);
    }
    Ok(())
}

impl ApiGateway {
    // Catalog

    pub async fn list_products(
        &self,
        scope: &RequestScope,
        query: &ProductQuery,
    ) -> Result<Page<ProductSummary>> {
        self.get_json(scope, &format!("/products?{}", query.to_query_string()))
            .await
    }

    pub async fn get_product(&self, scope: &RequestScope, slug: &str) -> Result<Product> {
        self.get_json(scope, &format!("/products/{}", path_segment(slug)))
            .await
    }

    pub async fn list_categories(&self, scope: &RequestScope) -> Result<Vec<Category>> {
        self.get_json(scope, "/categories").await
    }

    pub async fn featured_products(
        &self,
        scope: &RequestScope,
        limit: u32,
    ) -> Result<Vec<ProductSummary>> {
        self.get_json(scope, &format!("/products/featured?limit={}", limit.clamp(1, 48)))
            .await
    }

    // Account

    pub async fn login(&self, scope: &RequestScope, request: &LoginRequest) -> Result<AuthSession> {
        self.post_json(scope, "/auth/login", request).await
    }

    pub async fn register(
        &self,
        scope: &RequestScope,
        request: &RegisterRequest,
    ) -> Result<AuthSession> {
        self.post_json(scope, "/auth/register", request).await
    }

    pub async fn get_profile(&self, scope: &RequestScope) -> Result<Customer> {
        require_token(scope)?;
        self.get_json(scope, "/account/profile").await
    }

    pub async fn update_profile(
        &self,
        scope: &RequestScope,
        update: &UpdateProfile,
    ) -> Result<Customer> {
        require_token(scope)?;
        self.put_json(scope, "/account/profile", update).await
    }

    pub async fn list_orders(&self, scope: &RequestScope, page: u32) -> Result<Page<OrderSummary>> {
        require_token(scope)?;
        self.get_json(scope, &format!("/account/orders?page={}", page.max(1)))
            .await
    }

    pub async fn get_order(&self, scope: &RequestScope, id: &str) -> Result<Order> {
        require_token(scope)?;
        self.get_json(scope, &format!("/account/orders/{}", path_segment(id)))
            .await
    }

    // Checkout

    /// Guest checkout is allowed; the token is attached when present
    pub async fn place_order(&self, scope: &RequestScope, order: &OrderRequest) -> Result<Order> {
        self.post_json(scope, "/orders", order).await
    }

    // Returns

    pub async fn list_returns(&self, scope: &RequestScope) -> Result<Vec<ReturnSummary>> {
        require_token(scope)?;
        self.get_json(scope, "/account/returns").await
    }

    pub async fn create_return(
        &self,
        scope: &RequestScope,
        request: &ReturnRequest,
    ) -> Result<ReturnSummary> {
        require_token(scope)?;
        if request.lines.is_empty() {
            return Err(EgressError::Validation(
                "a return needs at least one line".to_string(),
            ));
        }
        self.post_json(scope, "/returns", request).await
    }

    // Content

    pub async fn list_posts(&self, scope: &RequestScope, page: u32) -> Result<Page<PostSummary>> {
        self.get_json(scope, &format!("/content/posts?page={}", page.max(1)))
            .await
    }

    pub async fn get_post(&self, scope: &RequestScope, slug: &str) -> Result<Post> {
        self.get_json(scope, &format!("/content/posts/{}", path_segment(slug)))
            .await
    }

    pub async fn get_page(&self, scope: &RequestScope, slug: &str) -> Result<ContentPage> {
        self.get_json(scope, &format!("/content/pages/{}", path_segment(slug)))
            .await
    }

    // Newsletter

    pub async fn subscribe(&self, scope: &RequestScope, email: &str) -> Result<()> {
        let request = SubscribeRequest {
            email: email.trim().to_string(),
        };
        self.post_json::<_, serde_json::Value>(scope, "/newsletter/subscriptions", &request)
            .await
            .map(|_| ())
    }
}
