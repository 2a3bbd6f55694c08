use anyhow::{Context, Result};

use super::Animation;

const HTML_START: &str = r#""html": ""#;
const CSS_START: &str = r#"", "css": ""#;
const JAVASCRIPT_START: &str = r#"", "javascript": ""#;
const END: &str = r#"" }"#;

/// Cuts the three fields out of a reply shaped like the one-shot example.
///
/// Assumes the keys appear in `html`, `css`, `javascript` order with no escaped
/// quotes inside the values. Anything else is misread or rejected.
pub fn extract(content: &str) -> Result<Animation> {
    Ok(Animation {
        html: between(content, HTML_START, CSS_START)?.to_owned(),
        css: between(content, CSS_START, JAVASCRIPT_START)?.to_owned(),
        javascript: between(content, JAVASCRIPT_START, END)?.to_owned(),
    })
}

fn between<'a>(content: &'a str, start: &str, end: &str) -> Result<&'a str> {
    let rest = content
        .split(start)
        .nth(1)
        .with_context(|| format!("Reply does not contain `{start}`: `{content}`"))?;

    Ok(rest.split(end).next().unwrap_or(rest))
}
