use alloy::primitives::Address;
use dotenvy::dotenv;
use eyre::{eyre, Result};
use rust_decimal::Decimal;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_http_url: String,
    pub tipping_address: Address,
    pub token_decimals: u32,
    pub conversion_rate: Decimal,
    pub top_n: usize,
    pub recent_limit: usize,
    pub block_lookup_concurrency: usize,
    pub port: u16,
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    let rpc_http_url =
        env::var("RPC_HTTP_URL").unwrap_or_else(|_| "https://api.testnet.abs.xyz".to_string());

    // Tipping contract on Abstract testnet (default deployment)
    let tipping_address = env::var("TIPPING_ADDRESS")
        .unwrap_or_else(|_| "0x1F49814E3aa4f8582c69a00421FBE9C2273046Ef".to_string())
        .parse::<Address>()
        .map_err(|e| eyre!("TIPPING_ADDRESS is not a valid address: {}", e))?;

    let token_decimals = env::var("TOKEN_DECIMALS")
        .unwrap_or_else(|_| "18".to_string())
        .parse()
        .unwrap_or(18);

    // Token → native weight for the leaderboard sort. A ranking heuristic
    // with no oracle behind it, so it stays configurable.
    let conversion_rate = env::var("TOKEN_CONVERSION_RATE")
        .unwrap_or_else(|_| "0.001".to_string())
        .parse::<Decimal>()
        .map_err(|e| eyre!("TOKEN_CONVERSION_RATE is not a decimal: {}", e))?;

    let top_n = env::var("TOP_N")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);

    let recent_limit = env::var("RECENT_LIMIT")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);

    let block_lookup_concurrency = env::var("BLOCK_LOOKUP_CONCURRENCY")
        .unwrap_or_else(|_| "8".to_string())
        .parse()
        .unwrap_or(8);

    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    Ok(Config {
        rpc_http_url,
        tipping_address,
        token_decimals,
        conversion_rate,
        top_n,
        recent_limit,
        block_lookup_concurrency,
        port,
    })
}
