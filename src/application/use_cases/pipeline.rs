//! Sequential two-stage chain and the end-to-end pipeline around it.
//!
//! Control flow is fixed: user request → schema selection → query generation
//! → extraction → validated execution. No branching, no retry, no
//! parallelism. A stage failure aborts the run; later stages are never
//! invoked and their chain-state keys are never written.

use crate::application::use_cases::code_extractor;
use crate::application::use_cases::code_generator::CodeGenerator;
use crate::application::use_cases::schema_selector::SchemaSelector;
use crate::application::use_cases::table_session::{ResultTable, TableSession};
use crate::domain::chain_state::{ChainState, GENERATED_QUERY, SCHEMA_SELECTION, USER_INPUT};
use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::prompt::PromptTemplate;
use crate::domain::request::UserRequest;
use crate::domain::schema_catalog::SchemaCatalog;
use crate::infrastructure::llm_clients::CompletionClient;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// The two prompt stages, threaded through [`ChainState`] key by key.
pub struct SequentialChain {
    selector: SchemaSelector,
    generator: CodeGenerator,
}

impl SequentialChain {
    pub fn new(catalog: &SchemaCatalog) -> Self {
        Self {
            selector: SchemaSelector::new(catalog),
            generator: CodeGenerator::new(),
        }
    }

    pub fn with_templates(
        catalog: &SchemaCatalog,
        selector_template: PromptTemplate,
        generator_template: PromptTemplate,
    ) -> Self {
        Self {
            selector: SchemaSelector::with_template(catalog, selector_template),
            generator: CodeGenerator::with_template(generator_template),
        }
    }

    /// Run both stages in order. The generation stage reads the key the
    /// selection stage wrote; if selection fails, generation is never
    /// invoked and `generated_query` is never written.
    pub async fn run(
        &self,
        client: &dyn CompletionClient,
        config: &LLMConfig,
        request: &UserRequest,
    ) -> Result<ChainState> {
        let mut state = ChainState::new(&request.text);

        let selection = self
            .selector
            .select(client, config, state.require(USER_INPUT)?)
            .await?;
        state.insert(SCHEMA_SELECTION, selection)?;

        let generated = self
            .generator
            .generate(client, config, state.require(SCHEMA_SELECTION)?)
            .await?;
        state.insert(GENERATED_QUERY, generated)?;

        Ok(state)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineTelemetry {
    pub run_id: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    /// Normalized hash of the request; raw text stays out of the logs.
    pub request_hash: String,
    pub chain_ms: i64,
    pub execution_ms: i64,
    pub total_ms: i64,
    pub row_count: usize,
    pub executed_sql: String,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub state: ChainState,
    pub result: ResultTable,
    pub telemetry: PipelineTelemetry,
}

/// Full run: chain, extraction, validated execution.
pub struct Pipeline {
    chain: SequentialChain,
    session: TableSession,
}

impl Pipeline {
    pub fn new(chain: SequentialChain, session: TableSession) -> Self {
        Self { chain, session }
    }

    pub fn session(&self) -> &TableSession {
        &self.session
    }

    pub async fn run(
        &self,
        client: &dyn CompletionClient,
        config: &LLMConfig,
        request: &UserRequest,
    ) -> Result<PipelineOutcome> {
        let start = Instant::now();

        let state = self.chain.run(client, config, request).await?;
        let chain_ms = start.elapsed().as_millis() as i64;

        let extracted = code_extractor::extract(state.require(GENERATED_QUERY)?)?;

        let execution_start = Instant::now();
        let result = self.session.execute(&extracted).await?;
        let execution_ms = execution_start.elapsed().as_millis() as i64;
        let total_ms = start.elapsed().as_millis() as i64;

        let telemetry = PipelineTelemetry {
            run_id: uuid::Uuid::new_v4().to_string(),
            completed_at: chrono::Utc::now(),
            request_hash: hash_request(&request.text),
            chain_ms,
            execution_ms,
            total_ms,
            row_count: result.row_count,
            executed_sql: extracted,
        };

        info!(
            run_id = %telemetry.run_id,
            request_hash = %telemetry.request_hash,
            rows = telemetry.row_count,
            total_ms = telemetry.total_ms,
            "Pipeline completed"
        );

        Ok(PipelineOutcome {
            state,
            result,
            telemetry,
        })
    }
}

/// Hash of the normalized request text, for logs and telemetry.
pub fn hash_request(request: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let normalized = request.trim().to_lowercase();
    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::table_session::SessionConfig;
    use crate::domain::error::AppError;
    use crate::domain::schema_catalog::presets;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Completion client that replays a fixed script of responses; `None`
    /// entries fail the call.
    struct ScriptedClient {
        responses: Mutex<Vec<Option<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Option<&str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|r| r.map(|s| s.to_string()))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _config: &LLMConfig, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.responses.lock().unwrap().pop() {
                Some(Some(text)) => Ok(text),
                _ => Err(AppError::LLMError("service unavailable".to_string())),
            }
        }
    }

    const CARD_AUTH_SEED: &str = "\
        CREATE TABLE posting_errors (posting_error_date TEXT, posting_error TEXT, line_confirmation_id TEXT, sales_order TEXT);\
        CREATE TABLE card_authorizations (line_confirmation_id TEXT, sales_order TEXT, auth_type TEXT, status TEXT, event_date TEXT, credit_card_type TEXT, amount REAL, authorization_code TEXT, seq_no REAL);\
        INSERT INTO card_authorizations VALUES ('LC1', 'SO1', 'Authorization', 'Approved', '2024-01-01', 'VISA', 100.0, 'A1', 1);\
        INSERT INTO card_authorizations VALUES ('LC1', 'SO1', 'Void', 'Declined', '2024-01-02', 'VISA', 100.0, 'A2', 2);\
        INSERT INTO card_authorizations VALUES ('LC2', 'SO2', 'Authorization', 'Approved', '2024-01-01', 'AMEX', 50.0, 'B1', 1);\
        INSERT INTO card_authorizations VALUES ('LC2', 'SO2', 'Finalization', 'Settled', '2024-01-03', 'AMEX', 50.0, 'B2', 2);";

    const SCENARIO_A_SELECTION: &str = "Schema: card_authorizations \
        (sales_order, line_confirmation_id, auth_type, status, seq_no). \
        Summary: find sales orders whose line confirmation moved from an \
        approved status to a declined void authorization.";

    const SCENARIO_A_QUERY: &str = "\
WITH latest_events AS (
    SELECT ca.sales_order, ca.line_confirmation_id, MAX(ca.seq_no) AS latest_seq
    FROM card_authorizations AS ca
    GROUP BY ca.sales_order, ca.line_confirmation_id
)
SELECT DISTINCT cur.sales_order, cur.line_confirmation_id
FROM card_authorizations AS cur
JOIN latest_events AS le
    ON le.sales_order = cur.sales_order
    AND le.line_confirmation_id = cur.line_confirmation_id
    AND le.latest_seq = cur.seq_no
JOIN card_authorizations AS prev
    ON prev.sales_order = cur.sales_order
    AND prev.line_confirmation_id = cur.line_confirmation_id
    AND prev.seq_no < cur.seq_no
WHERE cur.status = 'Declined'
    AND cur.auth_type = 'Void'
    AND prev.status = 'Approved'";

    async fn card_auth_pipeline() -> Pipeline {
        let chain = SequentialChain::new(&presets::card_authorizations());
        let session = TableSession::in_memory(CARD_AUTH_SEED, SessionConfig::default())
            .await
            .unwrap();
        Pipeline::new(chain, session)
    }

    #[tokio::test]
    async fn test_stage_two_not_invoked_after_stage_one_failure() {
        let chain = SequentialChain::new(&presets::card_authorizations());
        let client = ScriptedClient::new(vec![None]);
        let request = UserRequest::new("list declined authorizations").unwrap();

        let outcome = chain.run(&client, &LLMConfig::default(), &request).await;
        assert!(matches!(outcome, Err(AppError::LLMError(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_declined_void_authorizations() {
        let pipeline = card_auth_pipeline().await;
        let generation = format!("Here is the query:\n```sql\n{}\n```", SCENARIO_A_QUERY);
        let client = ScriptedClient::new(vec![
            Some(SCENARIO_A_SELECTION),
            Some(generation.as_str()),
        ]);
        let request = UserRequest::new(
            "Extract Sales orders that have same Line Confirmation ID, where the previous \
             Status was Approved but the latest Status is Declined and the Type is Void",
        )
        .unwrap();

        let outcome = pipeline
            .run(&client, &LLMConfig::default(), &request)
            .await
            .unwrap();

        // First prompt carries the exact request; second carries stage 1's output.
        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains(&request.text));
        assert!(prompts[1].contains(SCENARIO_A_SELECTION));
        drop(prompts);

        assert_eq!(outcome.telemetry.executed_sql, SCENARIO_A_QUERY.trim());
        assert_eq!(outcome.result.row_count, 1);
        assert_eq!(
            outcome.result.rows[0]["sales_order"],
            serde_json::json!("SO1")
        );
        assert_eq!(
            outcome.state.require(GENERATED_QUERY).unwrap(),
            generation.as_str()
        );
    }

    #[tokio::test]
    async fn test_scenario_unfenced_completion_is_malformed() {
        let pipeline = card_auth_pipeline().await;
        let client = ScriptedClient::new(vec![
            Some(SCENARIO_A_SELECTION),
            Some("SELECT ca.sales_order FROM card_authorizations AS ca"),
        ]);
        let request = UserRequest::new("list voided orders").unwrap();

        let err = pipeline
            .run(&client, &LLMConfig::default(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_scenario_unknown_table_fails_before_execution() {
        let pipeline = card_auth_pipeline().await;
        let client = ScriptedClient::new(vec![
            Some(SCENARIO_A_SELECTION),
            Some("```sql\nSELECT v.sales_order FROM vouchers AS v\n```"),
        ]);
        let request = UserRequest::new("list vouchered orders").unwrap();

        let err = pipeline
            .run(&client, &LLMConfig::default(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(err.to_string().contains("vouchers"));
    }

    #[test]
    fn test_request_hash_is_normalized() {
        assert_eq!(hash_request("List Orders"), hash_request("  list orders "));
        assert_ne!(hash_request("list orders"), hash_request("list sellers"));
    }
}
