use daily_pnl_core::{ClosedPosition, ExchangeError, PositionEvent, PositionEventKind};
use serde::{Deserialize, Deserializer};

/// Standard REST envelope: `{"code":0,"msg":"Success","data":...}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryPositions {
    #[serde(rename = "positionList", alias = "positions", default)]
    pub positions: Vec<HistoryPosition>,
    #[serde(default)]
    pub total: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPosition {
    #[serde(default, deserialize_with = "string_or_number_id")]
    pub position_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "realizedPNL", default, deserialize_with = "f64_from_str_or_num")]
    pub realized_pnl: f64,
}

impl From<HistoryPosition> for ClosedPosition {
    fn from(p: HistoryPosition) -> Self {
        Self {
            position_id: p.position_id,
            symbol: p.symbol,
            realized_pnl: p.realized_pnl,
        }
    }
}

/// Payload of a `position` channel push.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPush {
    #[serde(default)]
    pub event: String,
    #[serde(default, deserialize_with = "string_or_number_id")]
    pub position_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "realizedPNL", default, deserialize_with = "f64_from_str_or_num")]
    pub realized_pnl: f64,
}

impl From<PositionPush> for PositionEvent {
    fn from(p: PositionPush) -> Self {
        let kind = match p.event.to_ascii_uppercase().as_str() {
            "OPEN" => PositionEventKind::Open,
            "UPDATE" => PositionEventKind::Update,
            "CLOSE" => PositionEventKind::Close,
            _ => PositionEventKind::Unknown,
        };
        Self {
            kind,
            position_id: p.position_id,
            symbol: p.symbol,
            realized_pnl: p.realized_pnl,
        }
    }
}

/// Maps a non-zero API result code to the typed error category.
#[must_use]
pub fn api_error(code: i64, msg: &str) -> ExchangeError {
    match code {
        // 10003: api-key empty or unknown, 10004: IP not whitelisted
        10003 | 10004 => ExchangeError::Authentication(msg.to_string()),
        10007 => ExchangeError::Signature(msg.to_string()),
        10001 => ExchangeError::Network(msg.to_string()),
        _ => ExchangeError::Api {
            code,
            message: msg.to_string(),
        },
    }
}

fn f64_from_str_or_num<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
        Null,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) if s.trim().is_empty() => Ok(0.0),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null => Ok(0.0),
    }
}

fn string_or_number_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
