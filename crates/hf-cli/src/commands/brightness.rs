use serde::Deserialize;

use super::{api_client, error_for_status, friendly_error};

#[derive(Debug, Deserialize)]
struct BrightnessResponse {
    brightness: u8,
}

/// Run the `brightness` subcommand.
pub async fn run(api_url: &str, level: u8) -> anyhow::Result<()> {
    let resp = api_client()
        .get(format!("{api_url}/brightness/set/{level}"))
        .send()
        .await
        .map_err(friendly_error)?;
    let resp = error_for_status(resp).await?;
    let body: BrightnessResponse = resp.json().await.map_err(friendly_error)?;
    println!("Brightness set to {}%", body.brightness);
    Ok(())
}
