//! Colored log lines.
//!
//! Every line carries a `color` channel and its `swatch`; the channel also picks
//! the tracing level so filters behave sensibly.

use prospectcue_shared::ConsoleColor;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Emit one colored log line with an optional diagnostic object.
pub fn color_log(message: &str, color: ConsoleColor, detail: Option<&Value>) {
    let name = color.name();
    let swatch = color.swatch();
    let detail = detail.map(Value::to_string);
    let detail = detail.as_deref();

    match color {
        ConsoleColor::Red => error!(color = name, swatch, detail, "🪐 {message}"),
        ConsoleColor::Orange => warn!(color = name, swatch, detail, "🪐 {message}"),
        ConsoleColor::Green | ConsoleColor::Yellow => {
            info!(color = name, swatch, detail, "🪐 {message}")
        }
        ConsoleColor::Blue => debug!(color = name, swatch, detail, "🪐 {message}"),
    }
}

/// [`color_log`] without a diagnostic object.
pub fn log(message: &str, color: ConsoleColor) {
    color_log(message, color, None);
}
