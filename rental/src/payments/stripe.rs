//! Stripe implementation of [`PaymentGateway`].
//!
//! Talks to the REST API directly with `reqwest`: form-encoded requests,
//! bearer authentication with the secret key, JSON responses.

use super::gateway::{
    CheckoutSession, CheckoutSessionRequest, GatewayResult, PaymentGateway, PaymentGatewayError,
    PaymentStatus, ProductRef, ProductSpec, SessionStatus,
};
use crate::config::StripeConfig;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Metadata key linking a product to a car.
const CAR_ID_METADATA: &str = "carId";

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
    currency: String,
}

impl StripeGateway {
    /// Create a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentGatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentGatewayError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base)
    }

    /// URL of a single checkout session. The id is pushed as one
    /// percent-encoded path segment, so it can never leave the sessions
    /// collection.
    fn session_url(&self, session_id: &str) -> GatewayResult<Url> {
        let mut url = Url::parse(&self.url("checkout/sessions"))
            .map_err(|e| PaymentGatewayError::InvalidRequest(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                PaymentGatewayError::InvalidRequest("API base cannot carry a path".to_string())
            })?
            .push(session_id);
        Ok(url)
    }

    async fn find_product(&self, car_id: &str) -> GatewayResult<Option<ProductRef>> {
        let query = format!("metadata['{CAR_ID_METADATA}']:'{car_id}'");
        let response = self
            .client
            .get(self.url("products/search"))
            .bearer_auth(&self.secret_key)
            .query(&[("query", query.as_str()), ("limit", "1")])
            .send()
            .await
            .map_err(unreachable)?;

        let page: ListResponse<ProductObject> = decode(response).await?;
        Ok(page.data.into_iter().next().map(|p| ProductRef { id: p.id }))
    }

    async fn create_product(&self, spec: &ProductSpec) -> GatewayResult<ProductRef> {
        let car_id = spec.car_id.to_string();
        let mut form = vec![
            ("name".to_string(), spec.name.clone()),
            ("description".to_string(), spec.description.clone()),
            (format!("metadata[{CAR_ID_METADATA}]"), car_id.clone()),
        ];
        for (i, image) in spec.images.iter().take(8).enumerate() {
            form.push((format!("images[{i}]"), image.clone()));
        }

        let response = self
            .client
            .post(self.url("products"))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", format!("car-product-{car_id}"))
            .form(&form)
            .send()
            .await
            .map_err(unreachable)?;

        let product: ProductObject = decode(response).await?;
        Ok(ProductRef { id: product.id })
    }

    fn session_form(&self, request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), request.user_id.to_string()),
            ("customer_email".to_string(), request.customer_email.clone()),
            (
                "expires_at".to_string(),
                request.expires_at.timestamp().to_string(),
            ),
            ("metadata[carId]".to_string(), request.car_id.to_string()),
            ("metadata[userId]".to_string(), request.user_id.to_string()),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((
                format!("{prefix}[price_data][currency]"),
                self.currency.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.cents().to_string(),
            ));
            match &item.product {
                Some(product) => {
                    form.push((format!("{prefix}[price_data][product]"), product.id.clone()));
                }
                None => {
                    form.push((
                        format!("{prefix}[price_data][product_data][name]"),
                        item.name.clone(),
                    ));
                }
            }
        }

        form
    }
}

impl PaymentGateway for StripeGateway {
    fn ensure_product(
        &self,
        spec: ProductSpec,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ProductRef>> + Send + '_>> {
        Box::pin(async move {
            if let Some(product) = self.find_product(&spec.car_id.to_string()).await? {
                tracing::debug!(car_id = %spec.car_id, product_id = %product.id, "Reusing processor product");
                return Ok(product);
            }

            let product = self.create_product(&spec).await?;
            tracing::info!(car_id = %spec.car_id, product_id = %product.id, "Created processor product");
            Ok(product)
        })
    }

    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<CheckoutSession>> + Send + '_>> {
        Box::pin(async move {
            let form = self.session_form(&request);
            let response = self
                .client
                .post(self.url("checkout/sessions"))
                .bearer_auth(&self.secret_key)
                .form(&form)
                .send()
                .await
                .map_err(unreachable)?;

            let session: SessionObject = decode(response).await?;
            let url = session
                .url
                .ok_or_else(|| PaymentGatewayError::Decode("session has no url".to_string()))?;

            Ok(CheckoutSession {
                id: session.id,
                url,
            })
        })
    }

    fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<SessionStatus>> + Send + '_>> {
        let url = self.session_url(session_id);
        Box::pin(async move {
            let response = self
                .client
                .get(url?)
                .bearer_auth(&self.secret_key)
                .send()
                .await
                .map_err(unreachable)?;

            let session: SessionObject = decode(response).await?;
            Ok(SessionStatus {
                id: session.id,
                payment_status: session.payment_status,
            })
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ProductObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
    payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[allow(clippy::needless_pass_by_value)]
fn unreachable(err: reqwest::Error) -> PaymentGatewayError {
    PaymentGatewayError::Unreachable(err.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| PaymentGatewayError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or(body);

    Err(PaymentGatewayError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payments::gateway::LineItem;
    use crate::types::{CarId, Money, UserId};

    fn gateway() -> StripeGateway {
        StripeGateway::new(&StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: None,
            api_base: "https://api.stripe.com/".to_string(),
            currency: "usd".to_string(),
            webhook_tolerance: 300,
        })
        .unwrap()
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_url_building_strips_trailing_slash() {
        assert_eq!(
            gateway().url("checkout/sessions"),
            "https://api.stripe.com/v1/checkout/sessions"
        );
    }

    #[test]
    fn test_session_url_keeps_id_in_one_segment() {
        let gateway = gateway();
        assert_eq!(
            gateway.session_url("cs_test_a1").unwrap().as_str(),
            "https://api.stripe.com/v1/checkout/sessions/cs_test_a1"
        );

        let url = gateway.session_url("../../customers?limit=100#").unwrap();
        assert!(url.path().starts_with("/v1/checkout/sessions/"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_session_form_encodes_line_items() {
        let request = CheckoutSessionRequest {
            car_id: CarId::new(),
            user_id: UserId::new(),
            customer_email: "ada@example.com".to_string(),
            line_items: vec![
                LineItem {
                    product: Some(ProductRef {
                        id: "prod_1".to_string(),
                    }),
                    name: "Tesla Model 3".to_string(),
                    unit_amount: Money::from_cents(10_000),
                    quantity: 3,
                },
                LineItem {
                    product: None,
                    name: "Service fee".to_string(),
                    unit_amount: Money::from_cents(5_000),
                    quantity: 1,
                },
            ],
            success_url: "http://localhost/ok".to_string(),
            cancel_url: "http://localhost/no".to_string(),
            expires_at: chrono::Utc::now(),
        };

        let form = gateway().session_form(&request);

        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("3"));
        assert_eq!(
            field(&form, "line_items[0][price_data][unit_amount]"),
            Some("10000")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][product]"),
            Some("prod_1")
        );
        assert_eq!(
            field(&form, "line_items[1][price_data][product_data][name]"),
            Some("Service fee")
        );
        assert_eq!(field(&form, "line_items[1][price_data][currency]"), Some("usd"));
    }

    #[test]
    fn test_session_object_decodes() {
        let json = r#"{"id":"cs_test_1","url":null,"payment_status":"unpaid","object":"checkout.session"}"#;
        let session: SessionObject = serde_json::from_str(json).unwrap();
        assert_eq!(session.payment_status, PaymentStatus::Unpaid);
        assert!(session.url.is_none());
    }
}
