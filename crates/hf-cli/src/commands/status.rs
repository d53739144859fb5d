use serde::Deserialize;

use super::{api_client, error_for_status, friendly_error};

#[derive(Debug, Deserialize)]
struct PollerStatus {
    last_outcome: Option<String>,
    last_presence: Option<Presence>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Presence {
    wifi: bool,
    bluetooth: bool,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    mode: String,
    brightness: Option<u8>,
    poller: PollerStatus,
}

/// Run the `status` subcommand: fetch `/api/status` and print it.
pub async fn run(api_url: &str, json_output: bool) -> anyhow::Result<()> {
    let resp = api_client()
        .get(format!("{api_url}/api/status"))
        .send()
        .await
        .map_err(friendly_error)?;
    let resp = error_for_status(resp).await?;

    if json_output {
        let body: serde_json::Value = resp.json().await.map_err(friendly_error)?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let status: StatusResponse = resp.json().await.map_err(friendly_error)?;
    println!("{}", render(&status));
    Ok(())
}

fn render(status: &StatusResponse) -> String {
    let brightness = status
        .brightness
        .map(|b| format!("{b}%"))
        .unwrap_or_else(|| "unknown".to_string());
    let presence = match &status.poller.last_presence {
        Some(p) if p.wifi => "home (wifi)",
        Some(p) if p.bluetooth => "home (bluetooth)",
        Some(_) => "away",
        None => "not checked",
    };

    let mut out = String::new();
    out.push_str("homeframe status\n");
    out.push_str(&"-".repeat(40));
    out.push('\n');
    out.push_str(&format!("Mode:          {}\n", status.mode));
    out.push_str(&format!("Brightness:    {brightness}\n"));
    out.push_str(&format!("Phone:         {presence}\n"));
    out.push_str(&format!(
        "Last cycle:    {}\n",
        status.poller.last_outcome.as_deref().unwrap_or("none yet")
    ));
    out.push_str(&format!(
        "Updated:       {}",
        status.poller.updated_at.as_deref().unwrap_or("-")
    ));
    out
}
