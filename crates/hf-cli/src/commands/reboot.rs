use super::{api_client, error_for_status, friendly_error};

/// Run the `reboot` subcommand. Does nothing without `--yes`.
pub async fn run(api_url: &str, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("refusing to reboot the frame without --yes");
    }
    let resp = api_client()
        .get(format!("{api_url}/reboot"))
        .send()
        .await
        .map_err(friendly_error)?;
    error_for_status(resp).await?;
    println!("Rebooting...");
    Ok(())
}
