use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidsql::execution::{ExecutionErrorClass, QueryExecutor, ScalarStore, ScalarValue};
use vidsql::pipeline::{Answer, AnswerPipeline, GENERATION_FAILED_REPLY, RETRY_REPLY};
use vidsql::primary::{NullGenerator, PrimaryGenerator};
use vidsql::{GenerationSource, Orchestrator, Result, VidsqlError};

/// In-memory store: canned responses per exact query text, plus a log of what ran.
#[derive(Default)]
struct MemoryStore {
    responses: HashMap<String, std::result::Result<Option<ScalarValue>, String>>,
    executed: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn answer(mut self, sql: &str, value: ScalarValue) -> Self {
        self.responses.insert(sql.to_string(), Ok(Some(value)));
        self
    }

    fn fail(mut self, sql: &str, message: &str) -> Self {
        self.responses.insert(sql.to_string(), Err(message.to_string()));
        self
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScalarStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_scalar(&self, sql: &str) -> Result<Option<ScalarValue>> {
        self.executed.lock().unwrap().push(sql.to_string());
        match self.responses.get(sql) {
            Some(response) => response.clone().map_err(VidsqlError::Database),
            None => Err(VidsqlError::Database(format!("unexpected query: {}", sql))),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

struct ScriptedPrimary {
    output: Option<&'static str>,
    available: bool,
    calls: AtomicUsize,
}

impl ScriptedPrimary {
    fn returning(output: &'static str) -> Arc<Self> {
        Arc::new(Self {
            output: Some(output),
            available: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn absent() -> Arc<Self> {
        Arc::new(Self {
            output: None,
            available: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrimaryGenerator for ScriptedPrimary {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn attempt(&self, _question: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.map(str::to_string)
    }
}

fn pipeline(primary: Arc<dyn PrimaryGenerator>, store: Arc<MemoryStore>) -> AnswerPipeline {
    AnswerPipeline::new(
        Orchestrator::new(primary),
        QueryExecutor::new(store, Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn test_total_videos_without_primary() {
    let store = Arc::new(MemoryStore::default().answer("SELECT COUNT(*) FROM videos", ScalarValue::Integer(358)));
    let answer = pipeline(Arc::new(NullGenerator), store.clone())
        .answer("Сколько всего видео есть в системе?")
        .await;

    assert_eq!(answer.reply_text(), "358");
    assert_eq!(store.executed(), vec!["SELECT COUNT(*) FROM videos".to_string()]);
}

#[tokio::test]
async fn test_creator_question() {
    let sql = "SELECT COUNT(*) FROM videos WHERE creator_id = '123'";
    let store = Arc::new(MemoryStore::default().answer(sql, ScalarValue::Integer(4)));
    let answer = pipeline(Arc::new(NullGenerator), store.clone())
        .answer("Сколько видео у креатора с id 123?")
        .await;

    assert_eq!(answer.reply_text(), "4");
    assert_eq!(store.executed(), vec![sql.to_string()]);
}

#[tokio::test]
async fn test_views_threshold_with_grouped_digits() {
    let sql = "SELECT COUNT(*) FROM videos WHERE views_count > 100000";
    let store = Arc::new(MemoryStore::default().answer(sql, ScalarValue::Integer(12)));
    let pipeline = pipeline(Arc::new(NullGenerator), store.clone());

    for question in [
        "Сколько видео набрало больше 100000 просмотров?",
        "Сколько видео набрало больше 100 000 просмотров?",
        "Сколько видео набрало больше 100,000 просмотров?",
    ] {
        assert_eq!(pipeline.answer(question).await.reply_text(), "12");
    }
    assert_eq!(store.executed().len(), 3);
}

#[tokio::test]
async fn test_primary_execution_failure_recovers_with_rule_based_query() {
    let primary_sql = "SELECT COUNT(*) FROM video_snapshots WHERE views_count > 100000";
    let fallback_sql = "SELECT COUNT(*) FROM videos WHERE views_count > 100000";
    let store = Arc::new(
        MemoryStore::default()
            .fail(primary_sql, "relation \"video_snapshots\" does not exist")
            .answer(fallback_sql, ScalarValue::Integer(7)),
    );
    let primary = ScriptedPrimary::returning(primary_sql);
    let answer = pipeline(primary.clone(), store.clone())
        .answer("Сколько видео набрало больше 100000 просмотров?")
        .await;

    assert_eq!(
        answer,
        Answer::Value {
            value: ScalarValue::Integer(7),
            sql: fallback_sql.to_string(),
            source: GenerationSource::Fallback,
            recovered: true,
        }
    );
    assert_eq!(answer.reply_text(), "7");
    assert_eq!(primary.calls(), 1);
    assert_eq!(
        store.executed(),
        vec![primary_sql.to_string(), fallback_sql.to_string()]
    );
}

#[tokio::test]
async fn test_absent_primary_is_never_called() {
    let store = Arc::new(MemoryStore::default().answer("SELECT COUNT(*) FROM videos", ScalarValue::Integer(1)));
    let primary = ScriptedPrimary::absent();
    let answer = pipeline(primary.clone(), store.clone())
        .answer("Сколько всего видео есть в системе?")
        .await;

    assert_eq!(answer.reply_text(), "1");
    assert_eq!(primary.calls(), 0);
    assert_eq!(store.executed().len(), 1);
}

#[tokio::test]
async fn test_primary_output_is_used_when_valid() {
    let sql = "SELECT SUM(likes_count) FROM videos";
    let store = Arc::new(MemoryStore::default().answer(sql, ScalarValue::Numeric("1024".to_string())));
    let answer = pipeline(ScriptedPrimary::returning("```sql\nSELECT SUM(likes_count) FROM videos;\n```"), store.clone())
        .answer("Сколько лайков набрали все видео?")
        .await;

    assert_eq!(answer.reply_text(), "1024");
    assert!(matches!(
        answer,
        Answer::Value { source: GenerationSource::Primary, recovered: false, .. }
    ));
}

#[tokio::test]
async fn test_invalid_primary_output_falls_back_before_execution() {
    let store = Arc::new(MemoryStore::default().answer("SELECT COUNT(*) FROM videos", ScalarValue::Integer(9)));
    let answer = pipeline(ScriptedPrimary::returning("DELETE FROM videos"), store.clone())
        .answer("Сколько всего видео есть в системе?")
        .await;

    assert_eq!(answer.reply_text(), "9");
    assert_eq!(store.executed(), vec!["SELECT COUNT(*) FROM videos".to_string()]);
}

#[tokio::test]
async fn test_fallback_execution_failure_is_terminal() {
    let store = Arc::new(MemoryStore::default().fail(
        "SELECT COUNT(*) FROM videos",
        "connection refused",
    ));
    let answer = pipeline(Arc::new(NullGenerator), store.clone())
        .answer("Сколько всего видео есть в системе?")
        .await;

    assert_eq!(answer.reply_text(), RETRY_REPLY);
    match answer {
        Answer::ExecutionFailed(e) => assert_eq!(e.class, ExecutionErrorClass::Connectivity),
        other => panic!("expected execution failure, got {:?}", other),
    }
    assert_eq!(store.executed().len(), 1);
}

#[tokio::test]
async fn test_identical_fallback_query_is_not_retried() {
    let sql = "SELECT COUNT(*) FROM videos";
    let store = Arc::new(MemoryStore::default().fail(sql, "canceling statement due to statement timeout"));
    let answer = pipeline(ScriptedPrimary::returning(sql), store.clone())
        .answer("Покажи что-нибудь интересное")
        .await;

    assert_eq!(answer.reply_text(), RETRY_REPLY);
    assert_eq!(store.executed(), vec![sql.to_string()]);
}

#[tokio::test]
async fn test_second_level_fallback_failure_is_terminal() {
    let primary_sql = "SELECT COUNT(*) FROM videos WHERE creator = '123'";
    let fallback_sql = "SELECT COUNT(*) FROM videos WHERE creator_id = '123'";
    let store = Arc::new(
        MemoryStore::default()
            .fail(primary_sql, "column \"creator\" does not exist")
            .fail(fallback_sql, "connection reset by peer"),
    );
    let answer = pipeline(ScriptedPrimary::returning(primary_sql), store.clone())
        .answer("Сколько видео у креатора с id 123?")
        .await;

    assert_eq!(answer.reply_text(), RETRY_REPLY);
    assert_eq!(store.executed().len(), 2);
}

#[tokio::test]
async fn test_serve_lines_replies_per_question() {
    let store = Arc::new(
        MemoryStore::default()
            .answer("SELECT COUNT(*) FROM videos", ScalarValue::Integer(358))
            .answer("SELECT COUNT(*) FROM videos WHERE creator_id = '123'", ScalarValue::Integer(4)),
    );
    let pipeline = pipeline(Arc::new(NullGenerator), store.clone());
    let input: &[u8] = "Сколько всего видео есть в системе?\n\n   \nСколько видео у креатора с id 123?\n".as_bytes();
    let mut output = Vec::new();

    let answered = pipeline
        .serve_lines(tokio::io::BufReader::new(input), &mut output)
        .await
        .unwrap();

    assert_eq!(answered, 2);
    assert_eq!(String::from_utf8(output).unwrap(), "358\n4\n");
    assert_eq!(store.executed().len(), 2);
}

#[test]
fn test_fixed_replies() {
    assert_eq!(GENERATION_FAILED_REPLY, "Could not generate SQL. Please rephrase.");
    assert_eq!(RETRY_REPLY, "Error. Please try again.");
    assert_eq!(Answer::GenerationFailed.reply_text(), GENERATION_FAILED_REPLY);
}
