pub mod api_models;

use crate::config::CONFIG;
use crate::error::GameApiError;
use crate::models::*;
use crate::rate_limiter::RateLimiter;
use log::*;
use reqwest::{self, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

/// HTTP client for the remote fleet-control API (spec.md §4.2). Holds no
/// per-player credential: the daemon drives many players' containers
/// concurrently through one `ApiClient` (the rate limiter below is process-
/// global, matching the remote API's own limit), so every request carries
/// its caller's token as an explicit argument instead.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> ApiClient {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let client = reqwest::ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .https_only(true)
            .http1_only()
            .build()
            .unwrap();
        ApiClient {
            client,
            base_url: CONFIG.api_base_url.to_string(),
            rate_limiter: RateLimiter::from_config(),
        }
    }
}

impl ApiClient {
    /// Fallible request path used by callers that need to distinguish
    /// recoverable failures (rate limit, 5xx) from terminal ones, namely
    /// the navigation executor and container runtime. Does not panic.
    ///
    /// Takes `token` per call rather than storing one on `self`: the daemon
    /// runs many players' containers concurrently against one `ApiClient`
    /// (so the rate limiter is shared the way the remote API wants), and
    /// each player authenticates with their own token (spec.md §3 "Player
    /// ... opaque remote-API credential").
    pub async fn request_typed<T, U>(
        &self,
        token: &str,
        method: reqwest::Method,
        path: &str,
        json_body: Option<&U>,
    ) -> Result<T, GameApiError>
    where
        T: serde::de::DeserializeOwned,
        U: Serialize,
    {
        self.rate_limiter.acquire().await;
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = json_body {
            request = request.json(body);
        }
        request = request.header("Authorization", format!("Bearer {}", token));
        let response = request
            .send()
            .await
            .map_err(|e| GameApiError::Transport(e.to_string()))?;
        let status = response.status();
        debug!("{} {} {}", status.as_u16(), method, path);

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| GameApiError::Transport(e.to_string()))
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(|secs| (secs * 1000.0) as u64)
                .unwrap_or(1000);
            Err(GameApiError::RateLimited { retry_after_ms })
        } else if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            Err(GameApiError::Transient {
                status: status.as_u16(),
                message,
            })
        } else {
            let body: Value = response.json().await.unwrap_or_default();
            let code = body["error"]["code"].as_i64().unwrap_or(status.as_u16() as i64);
            let message = body["error"]["message"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| status.to_string());
            match status {
                StatusCode::NOT_FOUND => Err(GameApiError::NotFound(message)),
                StatusCode::CONFLICT => Err(GameApiError::Duplicate(message)),
                StatusCode::BAD_REQUEST if message.to_lowercase().contains("docked")
                    || message.to_lowercase().contains("in orbit")
                    || message.to_lowercase().contains("in transit") =>
                {
                    Err(GameApiError::InvalidState(message))
                }
                _ => Err(GameApiError::Api { code, message }),
            }
        }
    }

    pub async fn dock_ship_checked(&self, token: &str, ship_symbol: &str) -> Result<ShipNav, GameApiError> {
        let uri = format!("/my/ships/{}/dock", ship_symbol);
        let resp: Data<api_models::OrbitResponse> =
            self.request_typed(token, Method::POST, &uri, Some(&json!({}))).await?;
        Ok(resp.data.nav)
    }

    pub async fn orbit_ship_checked(&self, token: &str, ship_symbol: &str) -> Result<ShipNav, GameApiError> {
        let uri = format!("/my/ships/{}/orbit", ship_symbol);
        let resp: Data<api_models::OrbitResponse> =
            self.request_typed(token, Method::POST, &uri, Some(&json!({}))).await?;
        Ok(resp.data.nav)
    }

    pub async fn navigate_ship_checked(
        &self,
        token: &str,
        ship_symbol: &str,
        waypoint: &WaypointSymbol,
    ) -> Result<(ShipNav, ShipFuel), GameApiError> {
        let uri = format!("/my/ships/{}/navigate", ship_symbol);
        let resp: Data<api_models::NavigateResponse> = self
            .request_typed(token, Method::POST, &uri, Some(&json!({ "waypointSymbol": waypoint })))
            .await?;
        Ok((resp.data.nav, resp.data.fuel))
    }

    pub async fn set_flight_mode_checked(
        &self,
        token: &str,
        ship_symbol: &str,
        mode: ShipFlightMode,
    ) -> Result<ShipNav, GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        struct NavUpdateResponse {
            nav: ShipNav,
        }
        let uri = format!("/my/ships/{}/nav", ship_symbol);
        let resp: Data<NavUpdateResponse> = self
            .request_typed(token, Method::PATCH, &uri, Some(&json!({ "flightMode": mode })))
            .await?;
        Ok(resp.data.nav)
    }

    pub async fn refuel_ship_checked(
        &self,
        token: &str,
        ship_symbol: &str,
        units: Option<i64>,
    ) -> Result<ShipFuel, GameApiError> {
        let uri = format!("/my/ships/{}/refuel", ship_symbol);
        let mut body = json!({});
        if let Some(units) = units {
            body["units"] = json!(units);
        }
        let resp: Data<api_models::RefuelResponse> =
            self.request_typed(token, Method::POST, &uri, Some(&body)).await?;
        Ok(resp.data.fuel)
    }
}

/// Remaining typed GAC surface (spec.md §4.2): agent/fleet reads, waypoint
/// listing, shipyards, contracts and market trades. All route through
/// `request_typed`, so none of these can panic — callers get a
/// `GameApiError` and decide whether to retry.
impl ApiClient {
    pub async fn get_agent_checked(&self, token: &str) -> Result<Agent, GameApiError> {
        let resp: Data<Agent> = self.request_typed(token, Method::GET, "/my/agent", None::<&()>).await?;
        Ok(resp.data)
    }

    pub async fn get_ship_checked(&self, token: &str, ship_symbol: &str) -> Result<Ship, GameApiError> {
        let uri = format!("/my/ships/{}", ship_symbol);
        let resp: Data<Ship> = self.request_typed(token, Method::GET, &uri, None::<&()>).await?;
        Ok(resp.data)
    }

    pub async fn get_all_ships_checked(&self, token: &str) -> Result<Vec<Ship>, GameApiError> {
        self.get_all_pages_checked(token, "/my/ships").await
    }

    async fn get_all_pages_checked<T>(&self, token: &str, path: &str) -> Result<Vec<T>, GameApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        const PAGE_SIZE: u32 = 20;
        let mut page = 1;
        let mut out = Vec::new();
        loop {
            let uri = format!("{}?page={}&limit={}", path, page, PAGE_SIZE);
            let resp: PaginatedList<T> = self.request_typed(token, Method::GET, &uri, None::<&()>).await?;
            out.extend(resp.data);
            if resp.meta.page * PAGE_SIZE >= resp.meta.total {
                break;
            }
            page += 1;
        }
        Ok(out)
    }

    pub async fn list_waypoints_checked(
        &self,
        token: &str,
        system_symbol: &SystemSymbol,
    ) -> Result<Vec<api_models::WaypointDetailed>, GameApiError> {
        self.get_all_pages_checked(token, &format!("/systems/{}/waypoints", system_symbol))
            .await
    }

    pub async fn get_shipyard_checked(
        &self,
        token: &str,
        symbol: &WaypointSymbol,
    ) -> Result<Shipyard, GameApiError> {
        let uri = format!("/systems/{}/waypoints/{}/shipyard", symbol.system(), symbol);
        let resp: Data<Shipyard> = self.request_typed(token, Method::GET, &uri, None::<&()>).await?;
        Ok(resp.data)
    }

    pub async fn purchase_ship_checked(
        &self,
        token: &str,
        ship_type: &str,
        waypoint: &WaypointSymbol,
    ) -> Result<(Ship, Agent), GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct PurchaseShipResponse {
            ship: Ship,
            agent: Agent,
        }
        let resp: Data<PurchaseShipResponse> = self
            .request_typed(
                token,
                Method::POST,
                "/my/ships",
                Some(&json!({ "shipType": ship_type, "waypointSymbol": waypoint })),
            )
            .await?;
        Ok((resp.data.ship, resp.data.agent))
    }

    pub async fn get_contracts_checked(&self, token: &str) -> Result<Vec<Contract>, GameApiError> {
        self.get_all_pages_checked(token, "/my/contracts").await
    }

    pub async fn negotiate_contract_checked(
        &self,
        token: &str,
        ship_symbol: &str,
    ) -> Result<Contract, GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        struct NegotiateResponse {
            contract: Contract,
        }
        let uri = format!("/my/ships/{}/negotiate/contract", ship_symbol);
        let resp: Data<NegotiateResponse> =
            self.request_typed(token, Method::POST, &uri, Some(&json!({}))).await?;
        Ok(resp.data.contract)
    }

    pub async fn accept_contract_checked(&self, token: &str, contract_id: &str) -> Result<Contract, GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        struct AcceptResponse {
            contract: Contract,
        }
        let uri = format!("/my/contracts/{}/accept", contract_id);
        let resp: Data<AcceptResponse> =
            self.request_typed(token, Method::POST, &uri, Some(&json!({}))).await?;
        Ok(resp.data.contract)
    }

    pub async fn deliver_contract_checked(
        &self,
        token: &str,
        contract_id: &str,
        ship_symbol: &str,
        trade_symbol: &str,
        units: i64,
    ) -> Result<Contract, GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        struct DeliverResponse {
            contract: Contract,
        }
        let uri = format!("/my/contracts/{}/deliver", contract_id);
        let resp: Data<DeliverResponse> = self
            .request_typed(
                token,
                Method::POST,
                &uri,
                Some(&json!({
                    "shipSymbol": ship_symbol,
                    "tradeSymbol": trade_symbol,
                    "units": units,
                })),
            )
            .await?;
        Ok(resp.data.contract)
    }

    pub async fn fulfill_contract_checked(&self, token: &str, contract_id: &str) -> Result<Contract, GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        struct FulfillResponse {
            contract: Contract,
        }
        let uri = format!("/my/contracts/{}/fulfill", contract_id);
        let resp: Data<FulfillResponse> =
            self.request_typed(token, Method::POST, &uri, Some(&json!({}))).await?;
        Ok(resp.data.contract)
    }

    pub async fn get_market_checked(&self, token: &str, symbol: &WaypointSymbol) -> Result<Market, GameApiError> {
        let uri = format!("/systems/{}/waypoints/{}/market", symbol.system(), symbol);
        let resp: Data<Market> = self.request_typed(token, Method::GET, &uri, None::<&()>).await?;
        Ok(resp.data)
    }

    pub async fn purchase_cargo_checked(
        &self,
        token: &str,
        ship_symbol: &str,
        trade_symbol: &str,
        units: i64,
    ) -> Result<api_models::TradeResponse, GameApiError> {
        let uri = format!("/my/ships/{}/purchase", ship_symbol);
        let resp: Data<api_models::TradeResponse> = self
            .request_typed(
                token,
                Method::POST,
                &uri,
                Some(&json!({ "symbol": trade_symbol, "units": units })),
            )
            .await?;
        Ok(resp.data)
    }

    pub async fn sell_cargo_checked(
        &self,
        token: &str,
        ship_symbol: &str,
        trade_symbol: &str,
        units: i64,
    ) -> Result<api_models::TradeResponse, GameApiError> {
        let uri = format!("/my/ships/{}/sell", ship_symbol);
        let resp: Data<api_models::TradeResponse> = self
            .request_typed(
                token,
                Method::POST,
                &uri,
                Some(&json!({ "symbol": trade_symbol, "units": units })),
            )
            .await?;
        Ok(resp.data)
    }

    pub async fn jettison_cargo_checked(
        &self,
        token: &str,
        ship_symbol: &str,
        trade_symbol: &str,
        units: i64,
    ) -> Result<ShipCargo, GameApiError> {
        #[derive(Debug, Clone, serde::Deserialize)]
        struct JettisonResponse {
            cargo: ShipCargo,
        }
        let uri = format!("/my/ships/{}/jettison", ship_symbol);
        let resp: Data<JettisonResponse> = self
            .request_typed(
                token,
                Method::POST,
                &uri,
                Some(&json!({ "symbol": trade_symbol, "units": units })),
            )
            .await?;
        Ok(resp.data.cargo)
    }
}
