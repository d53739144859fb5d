use super::{api_client, error_for_status, friendly_error};

/// Screen routes exposed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    On,
    Off,
    Auto,
}

impl Action {
    fn path(self) -> &'static str {
        match self {
            Action::On => "/screen/on",
            Action::Off => "/screen/off",
            Action::Auto => "/screen/auto",
        }
    }

    fn done_message(self) -> &'static str {
        match self {
            Action::On => "Screen on (manual mode)",
            Action::Off => "Screen off (manual mode)",
            Action::Auto => "Automatic mode",
        }
    }
}

/// Run `on`, `off` or `auto`.
pub async fn run(api_url: &str, action: Action) -> anyhow::Result<()> {
    let resp = api_client()
        .get(format!("{api_url}{}", action.path()))
        .send()
        .await
        .map_err(friendly_error)?;
    error_for_status(resp).await?;
    println!("{}", action.done_message());
    Ok(())
}
