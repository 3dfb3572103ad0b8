//! The system instruction template.

use filechat_config::AssistantConfig;

/// Fixed persona text, optionally extended with the selected topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInstruction {
    base: String,
    topic_template: String,
}

impl SystemInstruction {
    /// `topic_template` must contain `{topic}`; it is appended to `base`
    /// only when a topic is selected.
    pub fn new(base: impl Into<String>, topic_template: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            topic_template: topic_template.into(),
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(&config.system_prompt, &config.topic_template)
    }

    /// Render the instruction for a session.
    pub fn render(&self, topic: Option<&str>) -> String {
        match topic.map(str::trim).filter(|t| !t.is_empty()) {
            Some(topic) => format!(
                "{} {}",
                self.base,
                self.topic_template.replace("{topic}", topic)
            ),
            None => self.base.clone(),
        }
    }
}

impl Default for SystemInstruction {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filechat_config::DEFAULT_SYSTEM_PROMPT;

    #[test]
    fn renders_base_without_topic() {
        let instruction = SystemInstruction::default();
        assert_eq!(instruction.render(None), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(instruction.render(Some("  ")), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn renders_topic_sentence() {
        let instruction = SystemInstruction::new("Be brief.", "Topic: {topic}.");
        assert_eq!(instruction.render(Some("Cooking")), "Be brief. Topic: Cooking.");
    }
}
