pub(crate) mod delimited;
pub(crate) mod openai;
pub(crate) mod prompt;
pub(crate) mod structured;

use anyhow::{Context, Result};
use strum::{Display, EnumString};

use crate::config::CompletionConfig;
use openai::ChatCompletion;

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Animation {
    pub html: String,
    pub css: String,
    pub javascript: String,
}

/// How the model is asked to shape its reply, and how the reply is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExtractionMode {
    /// One-shot example in the prompt, fields cut out of the reply text.
    Delimited,
    /// Forced function call, fields read from its JSON arguments.
    Structured,
}

impl ExtractionMode {
    pub fn default_model(self) -> &'static str {
        match self {
            ExtractionMode::Delimited => "gpt-3.5-turbo",
            ExtractionMode::Structured => "gpt-4",
        }
    }

    pub fn default_temperature(self) -> f64 {
        match self {
            ExtractionMode::Delimited => 0.2,
            ExtractionMode::Structured => 0.8,
        }
    }

    pub fn extract(self, completion: &ChatCompletion) -> Result<Animation> {
        let message = completion.first_message()?;

        match self {
            ExtractionMode::Delimited => {
                let content = message
                    .content
                    .as_deref()
                    .context("No message content in completion")?;
                tracing::debug!(%content, "completion content");
                delimited::extract(content)
            }
            ExtractionMode::Structured => {
                let arguments = message
                    .function_arguments()
                    .context("No function call in completion")?;
                tracing::debug!(%arguments, "completion function arguments");
                structured::extract(arguments)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub mode: ExtractionMode,
}

impl CompletionSettings {
    /// Command-line values win over the config file, which wins over the mode defaults.
    pub fn resolve(
        mode: ExtractionMode,
        model: Option<String>,
        temperature: Option<f64>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            base_url: config.base_url,
            model: model
                .or(config.model)
                .unwrap_or_else(|| mode.default_model().to_owned()),
            temperature: temperature
                .or(config.temperature)
                .unwrap_or_else(|| mode.default_temperature()),
            mode,
        }
    }
}

pub async fn generate(
    client: &reqwest::Client,
    settings: &CompletionSettings,
    api_key: &str,
    text: &str,
) -> Result<Animation> {
    let prompt = prompt::build(settings.mode, text);
    let completion = openai::complete(client, settings, api_key, &prompt).await?;
    let animation = settings.mode.extract(&completion)?;

    tracing::debug!(?animation, "extracted animation");

    Ok(animation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use serde_json::json;

    fn settings(base_url: String, mode: ExtractionMode) -> CompletionSettings {
        CompletionSettings {
            base_url,
            model: mode.default_model().to_owned(),
            temperature: mode.default_temperature(),
            mode,
        }
    }

    #[test]
    fn mode_parses_from_lowercase_name() {
        assert_eq!(
            "delimited".parse::<ExtractionMode>().unwrap(),
            ExtractionMode::Delimited
        );
        assert_eq!(
            "structured".parse::<ExtractionMode>().unwrap(),
            ExtractionMode::Structured
        );
        assert!("fancy".parse::<ExtractionMode>().is_err());
        assert_eq!(ExtractionMode::Structured.to_string(), "structured");
    }

    fn file_config(model: Option<&str>, temperature: Option<f64>) -> CompletionConfig {
        CompletionConfig {
            model: model.map(str::to_owned),
            temperature,
            ..CompletionConfig::default()
        }
    }

    #[test]
    fn resolve_falls_back_to_mode_defaults() {
        let settings = CompletionSettings::resolve(
            ExtractionMode::Delimited,
            None,
            None,
            file_config(None, None),
        );

        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.mode, ExtractionMode::Delimited);
        assert_eq!(settings.base_url, CompletionConfig::default().base_url);
    }

    #[test]
    fn resolve_prefers_config_file_over_defaults() {
        let settings = CompletionSettings::resolve(
            ExtractionMode::Structured,
            None,
            None,
            file_config(Some("gpt-4o"), Some(0.4)),
        );

        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.temperature, 0.4);
    }

    #[test]
    fn resolve_prefers_command_line_over_config_file() {
        let settings = CompletionSettings::resolve(
            ExtractionMode::Structured,
            Some("gpt-4-turbo".to_owned()),
            Some(1.1),
            file_config(Some("gpt-4o"), Some(0.4)),
        );

        assert_eq!(settings.model, "gpt-4-turbo");
        assert_eq!(settings.temperature, 1.1);
    }

    #[test]
    fn resolve_mixes_levels_per_field() {
        let settings = CompletionSettings::resolve(
            ExtractionMode::Structured,
            Some("gpt-4-turbo".to_owned()),
            None,
            file_config(None, Some(0.4)),
        );
        assert_eq!(settings.model, "gpt-4-turbo");
        assert_eq!(settings.temperature, 0.4);

        let settings = CompletionSettings::resolve(
            ExtractionMode::Structured,
            None,
            Some(1.1),
            file_config(Some("gpt-4o"), None),
        );
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.temperature, 1.1);
    }

    #[test]
    fn extract_fails_without_choices() {
        let completion: ChatCompletion = serde_json::from_value(json!({ "choices": [] })).unwrap();

        assert!(ExtractionMode::Delimited.extract(&completion).is_err());
        assert!(ExtractionMode::Structured.extract(&completion).is_err());
    }

    #[test]
    fn structured_mode_requires_a_function_call() {
        let completion =
            testing::content_completion(r#"{ "html": "A", "css": "B", "javascript": "C" }"#);

        assert!(ExtractionMode::Structured.extract(&completion).is_err());
    }

    #[tokio::test]
    async fn generate_with_delimited_mode() {
        let provider = testing::FakeProvider::replying(testing::content_reply(
            r#"{ "html": "<div></div>", "css": "div {}", "javascript": "run();" }"#,
        ));
        let base_url = testing::serve(provider.router()).await;

        let animation = generate(
            &reqwest::Client::new(),
            &settings(base_url, ExtractionMode::Delimited),
            "sk-test",
            "ドキドキ",
        )
        .await
        .unwrap();

        assert_eq!(
            animation,
            Animation {
                html: "<div></div>".to_owned(),
                css: "div {}".to_owned(),
                javascript: "run();".to_owned(),
            }
        );

        let request = provider.last_request().unwrap();
        assert_eq!(request["model"], "gpt-3.5-turbo");
        assert_eq!(request["messages"].as_array().unwrap().len(), 4);
        assert!(request.get("tools").is_none());
    }

    #[tokio::test]
    async fn generate_with_structured_mode() {
        let provider = testing::FakeProvider::replying(testing::function_reply(
            r#"{"html":"<p>ふわふわ</p>","css":"","javascript":"float();"}"#,
        ));
        let base_url = testing::serve(provider.router()).await;

        let animation = generate(
            &reqwest::Client::new(),
            &settings(base_url, ExtractionMode::Structured),
            "sk-test",
            "ふわふわ",
        )
        .await
        .unwrap();

        assert_eq!(animation.html, "<p>ふわふわ</p>");
        assert_eq!(animation.css, "");
        assert_eq!(animation.javascript, "float();");

        let request = provider.last_request().unwrap();
        assert_eq!(request["model"], "gpt-4");
        assert_eq!(request["tool_choice"]["function"]["name"], "create_animation");
    }
}
