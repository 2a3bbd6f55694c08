use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ExtractionMode;

pub const FUNCTION_NAME: &str = "create_animation";

const EXAMPLE_WORD: &str = "ザーザー";

const EXAMPLE_HTML: &str = r#"<!DOCTYPE html><html><head><title>ザーザー Animation</title><link rel="stylesheet" type="text/css"></head><body><div id="container"><div id="circle"></div></div><script src="script.js"></script></body></html>"#;

const EXAMPLE_CSS: &str = "#container { position: relative; width: 200px; height: 200px; overflow: hidden; } #circle { position: absolute; width: 100%; height: 100%; border-radius: 50%; background-color: blue; } ";

const EXAMPLE_JAVASCRIPT: &str = r#"const circle = document.getElementById("circle"); function animateCircle() { circle.style.transform = "scale(2)"; circle.style.transition = "transform 0.5s ease-in-out"; setTimeout(function() { circle.style.transform = "scale(1)"; circle.style.transition = "transform 0.5s ease-in-out"; }, 500); setTimeout(animateCircle, 1000); } animateCircle(); "#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub messages: Vec<Message>,
    /// When present the model must answer by calling this function.
    pub function: Option<FunctionSpec>,
}

pub fn build(mode: ExtractionMode, text: &str) -> Prompt {
    match mode {
        ExtractionMode::Delimited => Prompt {
            messages: vec![
                Message::new(
                    Role::System,
                    "You are a website developer. Using HTML, CSS and JavaScript, create an \
                     animation that conveys the meaning of the Japanese onomatopoeia the user \
                     enters. Reply with a JSON object that has exactly three keys: html, css \
                     and javascript.",
                ),
                Message::new(Role::User, EXAMPLE_WORD),
                Message::new(Role::Assistant, example_reply()),
                Message::new(Role::User, text),
            ],
            function: None,
        },
        ExtractionMode::Structured => Prompt {
            messages: vec![
                Message::new(
                    Role::System,
                    "You are a web designer and front-end developer. Create an HTML, CSS and \
                     JavaScript animation that visually expresses the meaning of the Japanese \
                     onomatopoeia the user enters. The markup must not load external \
                     stylesheets or scripts; they are injected separately.",
                ),
                Message::new(Role::User, text),
            ],
            function: Some(animation_function()),
        },
    }
}

/// The example reply, spliced together the same way the delimited reader
/// expects to pull it apart.
fn example_reply() -> String {
    format!(
        r#"{{ "html": "{EXAMPLE_HTML}", "css": "{EXAMPLE_CSS}", "javascript": "{EXAMPLE_JAVASCRIPT}" }}"#
    )
}

fn animation_function() -> FunctionSpec {
    FunctionSpec {
        name: FUNCTION_NAME,
        description: "Render an animation that expresses the meaning of an onomatopoeia.",
        parameters: json!({
            "type": "object",
            "properties": {
                "html": {
                    "type": "string",
                    "description": "Markup placed inside the animation container.",
                },
                "css": {
                    "type": "string",
                    "description": "Stylesheet applied to the markup.",
                },
                "javascript": {
                    "type": "string",
                    "description": "Script that drives the animation.",
                },
            },
            "required": ["html", "css", "javascript"],
            "additionalProperties": false,
        }),
        strict: true,
    }
}
