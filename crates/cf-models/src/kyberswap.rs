use serde::{Deserialize, Serialize};

/// Response of `GET /{chain}/api/v1/routes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KyberRouteResponse {
  pub code: i64,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub data: Option<KyberRouteData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KyberRouteData {
  pub route_summary: KyberRouteSummary,
  #[serde(default)]
  pub router_address: Option<String>,
}

/// Amounts are base-unit integers encoded as strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KyberRouteSummary {
  pub token_in: String,
  pub amount_in: String,
  #[serde(default)]
  pub amount_in_usd: Option<String>,
  pub token_out: String,
  pub amount_out: String,
  #[serde(default)]
  pub amount_out_usd: Option<String>,
  #[serde(default)]
  pub gas: Option<String>,
  #[serde(default)]
  pub gas_usd: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_route_response() {
    let json = r#"{
      "code": 0,
      "message": "successfully",
      "data": {
        "routeSummary": {
          "tokenIn": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
          "amountIn": "1000000000000000000",
          "amountInUsd": "3401.2",
          "tokenOut": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
          "amountOut": "3398120000",
          "amountOutUsd": "3398.1",
          "gas": "184000",
          "gasUsd": "4.1",
          "route": []
        },
        "routerAddress": "0x6131B5fae19EA4f9D964eAc0408E4408b66337b5"
      }
    }"#;
    let resp: KyberRouteResponse = serde_json::from_str(json).unwrap();
    let summary = resp.data.unwrap().route_summary;
    assert_eq!(summary.amount_out, "3398120000");
    assert_eq!(summary.gas.as_deref(), Some("184000"));
  }

  #[test]
  fn test_route_error_without_data() {
    let json = r#"{"code": 4008, "message": "route not found"}"#;
    let resp: KyberRouteResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.code, 4008);
    assert!(resp.data.is_none());
  }
}
