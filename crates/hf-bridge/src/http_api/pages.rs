use std::sync::Arc;

use axum::{extract::State, response::Html};
use tracing::warn;

use hf_core::mode::Mode;

use super::state::ApiState;

/// GET / -- the dashboard page.
pub(crate) async fn index(State(state): State<Arc<ApiState>>) -> Html<String> {
    let mode = state.mode.current();
    let brightness = match state.devices.monitor.get_brightness().await {
        Ok(level) => level,
        Err(e) => {
            warn!(error = %e, "brightness query failed, showing default");
            state.default_brightness
        }
    };
    Html(render_index(mode, brightness))
}

pub(crate) fn render_index(mode: Mode, brightness: u8) -> String {
    let mode_button = match mode {
        Mode::Auto => {
            r#"<a href="/screen/off"><button class="button button-auto">Auto Mode: ON</button></a>"#
        }
        Mode::Manual => {
            r#"<a href="/screen/auto"><button class="button button-manual">Auto Mode: OFF</button></a>"#
        }
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Frame Controller</title>
  <style>
    body {{ font-family: system-ui, sans-serif; background: #222; color: #eee; text-align: center; }}
    .button {{ background: #444; border: none; color: #fff; padding: 20px; font-size: 16px;
              margin: 10px 2px; cursor: pointer; border-radius: 12px; width: 80%; max-width: 400px; }}
    .button-auto {{ background: #27ae60; }}
    .button-manual, .button-danger {{ background: #c0392b; }}
    .panel {{ display: flex; justify-content: space-around; flex-wrap: wrap; background: #333;
             padding: 15px; border-radius: 12px; margin: 20px auto; width: 80%; max-width: 400px; }}
    .stat {{ flex: 1; min-width: 100px; }}
    .stat h3 {{ margin: 0 0 5px 0; font-size: 14px; color: #aaa; }}
    .stat p {{ margin: 0; font-size: 20px; font-weight: bold; }}
    input[type=range] {{ width: 80%; max-width: 400px; }}
  </style>
</head>
<body>
  <h1>Frame Controller</h1>
  <p>Mode: <strong id="mode">{mode}</strong></p>
  <div class="panel">
    <div class="stat"><h3>CPU Usage</h3><p id="cpu">--%</p></div>
    <div class="stat"><h3>Memory</h3><p id="mem">--%</p></div>
    <div class="stat"><h3>CPU Temp</h3><p id="temp">--°C</p></div>
  </div>
  <a href="/screen/on"><button class="button">Force Screen ON</button></a>
  <a href="/screen/off"><button class="button">Force Screen OFF</button></a>
  {mode_button}
  <div class="panel">
    <div class="stat">
      <h3>Brightness <span id="brightness-value">{brightness}</span>%</h3>
      <input id="brightness" type="range" min="0" max="100" value="{brightness}" />
    </div>
  </div>
  <hr style="border-color: #444; margin: 30px auto; width: 80%;">
  <a href="/reboot" onclick="return confirm('Are you sure you want to reboot?')"><button class="button button-danger">Reboot Pi</button></a>
  <script>
    const slider = document.getElementById('brightness');
    const label = document.getElementById('brightness-value');
    slider.oninput = () => {{ label.innerText = slider.value; }};
    slider.onchange = () => {{ fetch('/brightness/set/' + slider.value); }};

    const stats = new EventSource('/system-stats');
    stats.onmessage = (event) => {{
      const data = JSON.parse(event.data);
      document.getElementById('cpu').innerText = data.cpu.toFixed(1) + '%';
      document.getElementById('mem').innerText = data.mem.toFixed(1) + '%';
      document.getElementById('temp').innerText = data.temp.toFixed(1) + '°C';
    }};
  </script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_offers_manual_off() {
        let html = render_index(Mode::Auto, 70);
        assert!(html.contains(r#"<strong id="mode">Auto</strong>"#));
        assert!(html.contains("Auto Mode: ON"));
        assert!(html.contains(r#"value="70""#));
    }

    #[test]
    fn manual_mode_offers_return_to_auto() {
        let html = render_index(Mode::Manual, 50);
        assert!(html.contains(r#"<strong id="mode">Manual</strong>"#));
        assert!(html.contains(r#"href="/screen/auto""#));
        assert!(html.contains("EventSource('/system-stats')"));
    }
}
