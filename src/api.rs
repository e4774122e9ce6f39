use axum::{extract::Query, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::format::{format_scaled_amount, relative_time, shorten_address};
use crate::models::{Currency, LeaderboardEntry, RecentTipEntry, NATIVE_DECIMALS};
use crate::rpc::HttpLogSource;

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

type ApiError = (StatusCode, Json<Value>);

/// Pass failures map to 502 so the client can tell "unavailable" from an
/// empty-but-healthy result.
fn unavailable(err: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": err.to_string() })),
    )
}

pub async fn serve(cfg: Config, aggregator: Arc<Aggregator<HttpLogSource>>) -> eyre::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "Tip Aggregator API running" }))
        .route("/leaderboard", get({
            let aggregator = Arc::clone(&aggregator);
            let cfg = cfg.clone();
            move |q: Query<LimitQuery>| {
                let aggregator = Arc::clone(&aggregator);
                let cfg = cfg.clone();
                async move { leaderboard(aggregator, cfg, q.limit).await }
            }
        }))
        .route("/tips", get({
            let aggregator = Arc::clone(&aggregator);
            let cfg = cfg.clone();
            move |q: Query<LimitQuery>| {
                let aggregator = Arc::clone(&aggregator);
                let cfg = cfg.clone();
                async move { recent_tips(aggregator, cfg, q.limit).await }
            }
        }))
        .layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// ---------- handlers (each request runs a fresh aggregation pass) ----------

async fn leaderboard(
    aggregator: Arc<Aggregator<HttpLogSource>>,
    cfg: Config,
    limit: Option<usize>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let top_n = limit.unwrap_or(cfg.top_n);
    let ranked = aggregator.top_tippers(top_n).await.map_err(|e| {
        warn!("Leaderboard pass failed: {:?}", e);
        unavailable(e)
    })?;

    let entries = ranked
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let address = t.address.to_string();
            LeaderboardEntry {
                rank: i + 1,
                display_address: shorten_address(&address),
                address,
                native_total: t.native_total.to_string(),
                token_total: t.token_total.to_string(),
                native_display: format_scaled_amount(t.native_total, NATIVE_DECIMALS, 3),
                token_display: format_scaled_amount(t.token_total, cfg.token_decimals, 2),
                ranking_value: t.ranking_value.round_dp(3).to_string(),
            }
        })
        .collect();

    Ok(Json(entries))
}

async fn recent_tips(
    aggregator: Arc<Aggregator<HttpLogSource>>,
    cfg: Config,
    limit: Option<usize>,
) -> Result<Json<Vec<RecentTipEntry>>, ApiError> {
    let limit = limit.unwrap_or(cfg.recent_limit);
    let tips = aggregator.recent_tips(limit).await.map_err(|e| {
        warn!("Recent-tips pass failed: {:?}", e);
        unavailable(e)
    })?;

    // one reference point for every row's "time ago"
    let now = Utc::now().timestamp().max(0) as u64;

    let entries = tips
        .into_iter()
        .map(|tip| {
            let decimals = match tip.currency {
                Currency::Native => NATIVE_DECIMALS,
                Currency::Token => cfg.token_decimals,
            };
            let from = tip.from.to_string();
            let timestamp = tip.timestamp.unwrap_or(now);
            RecentTipEntry {
                display_from: shorten_address(&from),
                from,
                amount: tip.amount.to_string(),
                amount_display: format_scaled_amount(tip.amount, decimals, 3),
                currency: tip.currency,
                message: tip.custom_message().map(str::to_string),
                block_number: tip.block_number,
                tx_hash: tip.tx_hash.clone(),
                timestamp,
                time_ago: relative_time(now, timestamp),
            }
        })
        .collect();

    Ok(Json(entries))
}
