pub mod brightness;
pub mod reboot;
pub mod screen;
pub mod status;

use std::time::Duration;

/// Build the dashboard client.
///
/// Redirects are not followed: the screen routes answer with a redirect to
/// the dashboard page, which is the success signal.
pub fn api_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map common reqwest errors to user-friendly messages.
pub fn friendly_error(err: reqwest::Error) -> anyhow::Error {
    if err.is_connect() {
        anyhow::anyhow!(
            "Could not connect to the homeframe dashboard. Is hf-daemon running?\n  \
             (hint: check --url or HOMEFRAME_URL)"
        )
    } else if err.is_timeout() {
        anyhow::anyhow!("Request timed out. The frame may be busy or rebooting.")
    } else {
        anyhow::anyhow!("API request failed: {err}")
    }
}

/// Turn a non-success response into an error, using the `{"error": ...}`
/// body when there is one.
pub async fn error_for_status(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() || status.is_redirection() {
        return Ok(resp);
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    match body["error"].as_str() {
        Some(msg) => anyhow::bail!("{msg} (HTTP {status})"),
        None => anyhow::bail!("request failed (HTTP {status})"),
    }
}
