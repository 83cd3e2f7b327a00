//! Schema selection stage.
//!
//! Sends the user's request plus the fixed table catalog to the completion
//! service and returns its text block naming the chosen schema and a
//! restated summary of the request.

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::PromptTemplate;
use crate::domain::schema_catalog::SchemaCatalog;
use crate::domain::templates;
use crate::infrastructure::llm_clients::CompletionClient;
use std::collections::HashMap;
use tracing::debug;

pub struct SchemaSelector {
    template: PromptTemplate,
    catalog_block: String,
}

impl SchemaSelector {
    /// The catalog is compiled into the prompt once, at construction; it is
    /// not passed per call.
    pub fn new(catalog: &SchemaCatalog) -> Self {
        Self::with_template(catalog, templates::schema_selector())
    }

    pub fn with_template(catalog: &SchemaCatalog, template: PromptTemplate) -> Self {
        Self {
            template,
            catalog_block: catalog.render_prompt_block(),
        }
    }

    pub fn build_prompt(&self, user_input: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("user_input", user_input);
        vars.insert("catalog", self.catalog_block.as_str());
        self.template.render(&vars)
    }

    /// Returns the service's raw response text. The two-part output shape the
    /// template asks for is advisory; nothing here parses or verifies it.
    pub async fn select(
        &self,
        client: &dyn CompletionClient,
        config: &LLMConfig,
        user_input: &str,
    ) -> Result<String> {
        let prompt = self.build_prompt(user_input)?;
        debug!(
            template = %self.template.id,
            version = %self.template.version,
            "Running schema selection"
        );
        client.complete(config, &prompt).await
    }
}
