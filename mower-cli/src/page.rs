//! HTML rendering of the status snapshot.

use chrono::{DateTime, Local, Utc};
use mower_core::Status;
use std::fmt::Write;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn local(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%d %B %I:%M %p").to_string()
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "-",
    }
}

pub fn render_status(status: &Status) -> String {
    let decision = status.decision.as_ref();
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"300\">\n<title>Mower control</title>\n\
         <style>body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}\
         td,th{border:1px solid #ccc;padding:4px 8px}.wet{background:#dde8ff}\
         .error{color:#b00}</style>\n</head>\n<body>\n",
    );

    let names = if status.mower_names.is_empty() {
        "-".to_string()
    } else {
        escape(&status.mower_names.join(", "))
    };
    let _ = writeln!(html, "<h1>Mower control</h1>");
    let _ = writeln!(html, "<p>Mowers: {names}</p>");
    let _ = writeln!(
        html,
        "<p>Action: <strong>{}</strong>{}</p>",
        decision.map_or("-", |d| d.current_action.as_str()),
        if status.dry_run { " (dry run)" } else { "" }
    );
    let _ = writeln!(
        html,
        "<p>Currently raining: {}</p>",
        yes_no(decision.map(|d| d.currently_raining))
    );
    let _ = writeln!(
        html,
        "<p>Good weather: {}{}</p>",
        yes_no(decision.map(|d| d.good_weather)),
        decision.map_or(String::new(), |d| format!(" (score {:.2})", d.weather_score))
    );

    if let Some(current) = &status.current_weather {
        let _ = writeln!(
            html,
            "<p>Now: {} ({}), {:.1} &deg;C, wind {:.1} km/h</p>",
            escape(&current.description),
            current.weather_code,
            current.temperature_c,
            current.wind_speed_kmh
        );
    }
    let _ = writeln!(
        html,
        "<p>Last update: {}</p>",
        status.updated_at.map_or("never".to_string(), local)
    );
    if let Some(err) = &status.last_error {
        let _ = writeln!(html, "<p class=\"error\">Last error: {}</p>", escape(err));
    }

    if let Some(decision) = decision {
        html.push_str(
            "<h2>Forecast</h2>\n<table>\n<tr><th>Time</th><th>Code</th><th>Description</th>\
             <th>Intensity</th><th>Weight</th><th>Action</th></tr>\n",
        );
        for entry in &decision.forecast_analysis {
            let _ = writeln!(
                html,
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                if entry.good_weather { "" } else { " class=\"wet\"" },
                escape(&entry.local_time),
                entry.weather_code,
                escape(&entry.description),
                entry.intensity,
                entry.weight,
                entry.action.as_str()
            );
        }
        html.push_str("</table>\n");
    }

    if !status.past_weather.is_empty() {
        html.push_str(
            "<h2>Past weather</h2>\n<table>\n<tr><th>Time</th><th>Code</th>\
             <th>Description</th><th>Intensity</th></tr>\n",
        );
        for sample in status.past_weather.iter().rev() {
            let _ = writeln!(
                html,
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                if sample.intensity.is_dry() { "" } else { " class=\"wet\"" },
                local(sample.utc_time),
                sample.weather_code,
                escape(&sample.description),
                sample.intensity
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use mower_core::{Action, DecisionState, WeatherSample};

    #[test]
    fn empty_status_renders_placeholders() {
        let html = render_status(&Status::default());
        assert!(html.contains("Mowers: -"));
        assert!(html.contains("Last update: never"));
        assert!(!html.contains("<h2>Forecast</h2>"));
    }

    #[test]
    fn renders_decision_and_escapes_names() {
        let status = Status {
            mower_names: vec!["<Front>".into()],
            past_weather: vec![WeatherSample::new(Utc::now(), 63)],
            decision: Some(DecisionState {
                currently_raining: false,
                good_weather: false,
                weather_score: -0.25,
                forecast_analysis: Vec::new(),
                current_action: Action::Weather,
            }),
            last_error: Some("Failed to fetch mowers".into()),
            ..Status::default()
        };

        let html = render_status(&status);

        assert!(html.contains("&lt;Front&gt;"));
        assert!(html.contains("<strong>Weather</strong>"));
        assert!(html.contains("score -0.25"));
        assert!(html.contains("Rain (moderate)"));
        assert!(html.contains("Last error: Failed to fetch mowers"));
    }
}
