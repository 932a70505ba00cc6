//! `aipctl config validate`.

use aip_auction_common::config::{load_bidder_config, load_platform_config, load_server_settings};

pub fn validate(server_path: &str, bidders_path: Option<&str>, platforms_path: Option<&str>) -> Result<(), String> {
    let settings = load_server_settings(server_path).map_err(|report| format!("{report:?}"))?;
    println!("server config OK: window_ms={}", settings.window_ms);

    let bidders_path = bidders_path.unwrap_or(&settings.bidder_config_path);
    let bidders = load_bidder_config(bidders_path).map_err(|report| format!("{report:?}"))?;
    println!("bidder config OK: {} bidder(s) configured", bidders.len());

    let platforms_path = platforms_path.unwrap_or(&settings.platforms_config_path);
    let platforms = load_platform_config(platforms_path).map_err(|report| format!("{report:?}"))?;
    println!("platform config OK: {} platform(s) configured", platforms.len());

    Ok(())
}
