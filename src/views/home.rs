use crate::models::sensor::{sensor_label, SensorReading};
use crate::views::layout::{html_escape, render_page, Page};
use crate::views::state::{MenuState, Notice, SubscribeForm};

/// Replaces the readings panel on every pushed snapshot; the browser closes the stream when the page goes away.
const LIVE_SCRIPT: &str = r#"<script>
(function () {
  var panel = document.getElementById("readings");
  if (!window.EventSource || !panel) return;
  var labels = { ph: ["pH", "pH"], tds: ["TDS", "ppm"], temp: ["Temperature", "°C"] };
  var source = new EventSource("/api/v1/sensors/stream");
  source.addEventListener("readings", function (event) {
    var readings = JSON.parse(event.data);
    panel.textContent = "";
    if (readings.length === 0) {
      var empty = document.createElement("p");
      empty.className = "muted";
      empty.textContent = "No sensor data yet.";
      panel.appendChild(empty);
      return;
    }
    readings.forEach(function (reading) {
      var label = labels[reading.sensorId] || [reading.sensorId, ""];
      var card = document.createElement("div");
      card.className = "card";
      var title = document.createElement("p");
      title.textContent = label[0];
      var value = document.createElement("h2");
      value.textContent = (reading.value === null ? "--" : reading.value) + " " + label[1];
      card.appendChild(title);
      card.appendChild(value);
      panel.appendChild(card);
    });
  });
  source.addEventListener("gateway-error", function () { source.close(); });
  window.addEventListener("pagehide", function () { source.close(); });
})();
</script>"#;

pub fn render_home(menu: MenuState, readings: Option<&[SensorReading]>, form: &SubscribeForm) -> String {
    let body = format!(
        r#"<section>
<h1>ClariaSense</h1>
<p>Live water quality from your aquarium sensors.</p>
<div id="readings" class="grid">{readings}</div>
</section>
<section>
<h2>Stay in the loop</h2>
{notice}
<form method="post" action="/subscribe">
<input type="email" name="email" required placeholder="you@example.com" value="{email}">
<button type="submit">Subscribe</button>
</form>
</section>
{script}"#,
        readings = render_readings(readings),
        notice = render_notice(form.notice.as_ref()),
        email = html_escape(&form.email),
        script = LIVE_SCRIPT,
    );

    render_page(Page::Home, menu, "", &body)
}

fn render_readings(readings: Option<&[SensorReading]>) -> String {
    match readings {
        None => r#"<p class="muted">Live readings are unavailable right now.</p>"#.to_string(),
        Some([]) => r#"<p class="muted">No sensor data yet.</p>"#.to_string(),
        Some(readings) => readings
            .iter()
            .map(|reading| {
                let (label, unit) = sensor_label(&reading.sensor_id);
                format!(
                    r#"<div class="card"><p>{}</p><h2>{} {}</h2></div>"#,
                    html_escape(label),
                    reading.display_value(),
                    unit
                )
            })
            .collect(),
    }
}

fn render_notice(notice: Option<&Notice>) -> String {
    let (class, text) = match notice {
        None => return String::new(),
        Some(Notice::Success(text)) => ("success", text),
        Some(Notice::Info(text)) => ("info", text),
        Some(Notice::Failure(text)) => ("failure", text),
    };
    format!(r#"<p class="notice {}" role="status">{}</p>"#, class, html_escape(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sensor::reduce_snapshot;
    use serde_json::json;

    #[test]
    fn test_renders_labelled_readings() {
        let readings = reduce_snapshot(Some(&json!({"ph": "7.2", "tds": "350", "temp": "25"})));
        let html = render_home(MenuState::default(), Some(&readings), &SubscribeForm::default());

        assert!(html.contains("<p>pH</p><h2>7.2 pH</h2>"));
        assert!(html.contains("<h2>350 ppm</h2>"));
        assert!(html.contains("<p>Temperature</p><h2>25 °C</h2>"));
    }

    #[test]
    fn test_empty_and_unavailable_readings() {
        let html = render_home(MenuState::default(), Some(&[]), &SubscribeForm::default());
        assert!(html.contains("No sensor data yet."));

        let html = render_home(MenuState::default(), None, &SubscribeForm::default());
        assert!(html.contains("Live readings are unavailable"));
    }

    #[test]
    fn test_form_keeps_escaped_email_and_notice() {
        let form = SubscribeForm {
            email: "\"><b>@x.io".to_string(),
            notice: Some(Notice::Failure("Please enter a valid email address.".to_string())),
        };
        let html = render_home(MenuState::default(), Some(&[]), &form);

        assert!(html.contains(r#"value="&quot;&gt;&lt;b&gt;@x.io""#));
        assert!(html.contains(r#"class="notice failure""#));
    }
}
