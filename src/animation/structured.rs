use anyhow::{Context, Result};
use serde::Deserialize;

use super::Animation;

#[derive(Deserialize)]
struct Arguments {
    html: Option<String>,
    css: Option<String>,
    javascript: Option<String>,
}

/// Reads the fields from the forced function call's JSON arguments.
///
/// Absent, `null` and empty values all come back as the empty string.
pub fn extract(arguments: &str) -> Result<Animation> {
    let arguments: Arguments = serde_json::from_str(arguments).context(format!(
        "Failed to parse function call arguments from: `{arguments}`"
    ))?;

    Ok(Animation {
        html: arguments.html.unwrap_or_default(),
        css: arguments.css.unwrap_or_default(),
        javascript: arguments.javascript.unwrap_or_default(),
    })
}
