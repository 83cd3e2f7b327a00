//! Query generation stage.
//!
//! Sends the schema-selection output plus the fixed rule list to the
//! completion service; the response is expected (but not guaranteed) to
//! contain exactly one fenced block of SQL.

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::PromptTemplate;
use crate::domain::templates;
use crate::infrastructure::llm_clients::CompletionClient;
use std::collections::HashMap;
use tracing::debug;

pub struct CodeGenerator {
    template: PromptTemplate,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::with_template(templates::code_generator())
    }

    pub fn with_template(template: PromptTemplate) -> Self {
        Self { template }
    }

    pub fn build_prompt(&self, schema_selection: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("schema_selection", schema_selection);
        self.template.render(&vars)
    }

    pub async fn generate(
        &self,
        client: &dyn CompletionClient,
        config: &LLMConfig,
        schema_selection: &str,
    ) -> Result<String> {
        let prompt = self.build_prompt(schema_selection)?;
        debug!(
            template = %self.template.id,
            version = %self.template.version,
            "Running query generation"
        );
        client.complete(config, &prompt).await
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_schema_selection() {
        let generator = CodeGenerator::new();
        let prompt = generator
            .build_prompt("Chosen table: card_authorizations")
            .unwrap();
        assert!(prompt.contains("Chosen table: card_authorizations"));
        assert!(prompt.contains("ELIMINATE WINDOW FUNCTIONS"));
    }
}
