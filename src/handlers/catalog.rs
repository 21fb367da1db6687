use std::sync::Arc;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::domain::order::OrderSubmission;
use crate::domain::ports::{CatalogLookup, CustomerDirectory, OrderSubmitter};
use crate::domain::product::ProductId;
use crate::errors::AppError;
use crate::infrastructure::stub_catalog::StubCatalog;

/// Shared state of the stub catalog server.
pub struct StubState {
    pub catalog: Arc<StubCatalog>,
    pub token: String,
}

impl StubState {
    fn authorize(&self, req: &HttpRequest) -> Result<(), AppError> {
        let presented = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        match presented {
            Some(token) if token == self.token => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }
}

// ── Query parameters ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BrandQuery {
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub brand: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BarcodeQuery {
    pub barcode: String,
    pub brand: Option<String>,
    pub category: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/brands
pub async fn list_brands(
    state: web::Data<StubState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    Ok(HttpResponse::Ok().json(state.catalog.list_brands().await?))
}

/// GET /api/categories?brand=
pub async fn list_categories(
    state: web::Data<StubState>,
    req: HttpRequest,
    query: web::Query<BrandQuery>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    let categories = state.catalog.list_categories(query.brand.as_deref()).await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// GET /api/products?brand=&category=
pub async fn list_products(
    state: web::Data<StubState>,
    req: HttpRequest,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    let products = state
        .catalog
        .list_products(query.brand.as_deref(), query.category.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(products))
}

/// GET /api/products/search?barcode=&brand=&category=
pub async fn search_products(
    state: web::Data<StubState>,
    req: HttpRequest,
    query: web::Query<BarcodeQuery>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    let matches = state
        .catalog
        .search_by_barcode(&query.barcode, query.brand.as_deref(), query.category.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(matches))
}

/// GET /api/products/{id}
pub async fn get_product(
    state: web::Data<StubState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    let product = state.catalog.find_product(&ProductId::new(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(product))
}

/// GET /api/customers
pub async fn list_customers(
    state: web::Data<StubState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    Ok(HttpResponse::Ok().json(state.catalog.list_customers().await?))
}

/// GET /api/customers/{id}/addresses
pub async fn list_addresses(
    state: web::Data<StubState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    let addresses = state.catalog.list_addresses(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(addresses))
}

/// POST /api/orders
///
/// Records the order and answers `201` with the new order id.
pub async fn create_order(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Json<OrderSubmission>,
) -> Result<HttpResponse, AppError> {
    state.authorize(&req)?;
    let submitted = state.catalog.submit(body.into_inner()).await?;
    log::info!("Recorded order {}", submitted.order_id);
    Ok(HttpResponse::Created().json(submitted))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::routes;

    fn state() -> web::Data<StubState> {
        web::Data::new(StubState {
            catalog: Arc::new(StubCatalog::sample()),
            token: "secret".to_string(),
        })
    }

    #[actix_web::test]
    async fn rejects_missing_or_wrong_token() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/brands").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/brands")
            .insert_header((header::AUTHORIZATION, "Bearer nope"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn serves_search_ahead_of_product_ids() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/products/search?barcode=7000001&category=Soap")
            .insert_header((header::AUTHORIZATION, "Bearer secret"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::get()
            .uri("/api/products/42")
            .insert_header((header::AUTHORIZATION, "Bearer secret"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn create_order_answers_created() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((header::AUTHORIZATION, "Bearer secret"))
            .set_json(json!({
                "customer_id": 1,
                "address_id": 10,
                "note": "",
                "products": [{"product_id": 3, "quantity": 2}]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((header::AUTHORIZATION, "Bearer secret"))
            .set_json(json!({
                "customer_id": 2,
                "address_id": 10,
                "note": "",
                "products": [{"product_id": 3, "quantity": 2}]
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
