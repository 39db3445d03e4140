//! Request and response envelopes for the line protocol
//!
//! One JSON object per line in each direction. Requests are tagged by
//! `event`; responses echo the event and carry either `ok` or `error`,
//! where `error` is the engine's wire code.
//!
//! ```text
//! {"event":"query","address":"0x..","tokenIn":"usdt","tokenOut":"eth","amountIn":"1000000"}
//! {"event":"query","ok":[{"lpId":"0x..","from":"0x..","to":"0x..","tokenTag":"usdt","amount":"1000000"}, ...]}
//! {"event":"query","error":"err_no_path"}
//! ```

use actors::{ActorError, RegistryHandle};
use amm::{LiquidityAdd, LiquidityRemove, Path, PoolId, PriceDirection, SwapQuery};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Code returned for lines that do not parse as a request
pub const ERR_INVALID_REQUEST: &str = "err_invalid_request";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Request {
    Add {
        address: String,
        liquidity: LiquidityAdd,
    },
    Remove {
        address: String,
        liquidity: LiquidityRemove,
    },
    Query(SwapQuery),
    Verify {
        address: String,
        paths: Vec<Path>,
    },
    Submit {
        address: String,
        paths: Vec<Path>,
    },
    Positions {
        address: String,
    },
    Price {
        #[serde(rename = "poolId")]
        pool_id: PoolId,
        direction: PriceDirection,
    },
}

impl Request {
    pub fn event(&self) -> &'static str {
        match self {
            Request::Add { .. } => "add",
            Request::Remove { .. } => "remove",
            Request::Query(_) => "query",
            Request::Verify { .. } => "verify",
            Request::Submit { .. } => "submit",
            Request::Positions { .. } => "positions",
            Request::Price { .. } => "price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(event: &str, body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                event: event.to_string(),
                ok: Some(value),
                error: None,
            },
            Err(err) => {
                warn!(event, error = %err, "response body did not encode");
                Self::error(event, "err_encode")
            }
        }
    }

    pub fn error(event: &str, code: &str) -> Self {
        Self {
            event: event.to_string(),
            ok: None,
            error: Some(code.to_string()),
        }
    }

    fn from_result<T: Serialize>(event: &str, result: Result<T, ActorError>) -> Self {
        match result {
            Ok(body) => Self::ok(event, body),
            Err(err) => {
                debug!(event, code = err.code(), "request failed");
                Self::error(event, err.code())
            }
        }
    }
}

/// Run one request against the registry actor
pub async fn dispatch(handle: &RegistryHandle, request: Request) -> Response {
    let event = request.event();
    match request {
        Request::Add { address, liquidity } => {
            let result = handle
                .add_liquidity(&address, liquidity)
                .await
                .map(|id| json!({ "positionId": id }));
            Response::from_result(event, result)
        }
        Request::Remove { address, liquidity } => {
            Response::from_result(event, handle.remove_liquidity(&address, liquidity).await)
        }
        Request::Query(query) => Response::from_result(event, handle.query(query).await),
        Request::Verify { address, paths } => {
            Response::from_result(event, handle.verify(&address, paths).await.map(|()| true))
        }
        Request::Submit { address, paths } => {
            Response::from_result(event, handle.update(&address, paths).await)
        }
        Request::Positions { address } => {
            Response::from_result(event, handle.positions_of(&address).await)
        }
        Request::Price { pool_id, direction } => {
            let result = handle
                .current_price(pool_id, direction)
                .await
                .map(|price| json!({ "price": price }));
            Response::from_result(event, result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tags() {
        let query: Request = serde_json::from_str(
            r#"{"event":"query","address":"0x911F42b0229c15bBB38D648B7Aa7CA480eD977d6","tokenIn":"usdt","tokenOut":"eth","amountIn":"1000000"}"#,
        )
        .unwrap();
        assert_eq!(query.event(), "query");

        let price: Request =
            serde_json::from_str(r#"{"event":"price","poolId":"0xabc","direction":"up"}"#).unwrap();
        match price {
            Request::Price { pool_id, direction } => {
                assert_eq!(pool_id.as_str(), "0xabc");
                assert_eq!(direction, PriceDirection::Up);
            }
            other => panic!("unexpected request {other:?}"),
        }

        assert!(serde_json::from_str::<Request>(r#"{"event":"mint"}"#).is_err());
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_string(&Response::ok("verify", true)).unwrap();
        assert_eq!(ok, r#"{"event":"verify","ok":true}"#);
        let err = serde_json::to_string(&Response::error("query", "err_no_path")).unwrap();
        assert_eq!(err, r#"{"event":"query","error":"err_no_path"}"#);
    }
}
