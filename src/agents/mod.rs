//! The agency
//!
//! Six personas collaborate on every turn:
//!
//! ```text
//!  ┌──────────────┐   ┌──────────────┐
//!  │   Cultural   │   │  Behavioral  │   (roots, run concurrently)
//!  │   Analyst    │   │   Analyst    │
//!  └──────┬───────┘   └──────┬───────┘
//!         └────────┬─────────┘
//!                  ▼
//!           ┌──────────────┐
//!           │    Visual    │   (consumes both root reports)
//!           │  Strategist  │
//!           └──────┬───────┘
//!                  ▼
//!           ┌──────────────┐
//!           │    Growth    │
//!           │  Strategist  │
//!           └──────┬───────┘
//!                  ▼
//!           ┌──────────────┐
//!           │    Critic    │   (audits the visual synthesis only)
//!           └──────┬───────┘
//!                  ▼
//!           ┌──────────────┐
//!           │   Director   │   (terminal; streamed to the user)
//!           └──────────────┘
//! ```
//!
//! A task runs only once its declared dependencies are done. Any non-terminal
//! failure aborts the whole turn: a brand identity synthesized from
//! incomplete expert input is worse than a visible failure.

pub mod behavioral;
pub mod critic;
pub mod cultural;
pub mod director;
pub mod growth;
pub mod visual;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::cache::AgentCache;
use crate::llm::provider::TextGenerator;
use crate::models::ChatMessage;
use crate::scrape::{detect_url, PageFetcher};
use crate::stream::FrameSink;
use crate::types::{AppError, AppResult, ImageData};
use crate::utils::retry::{with_retry, RetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentId {
    Cultural,
    Behavioral,
    Visual,
    Growth,
    Critic,
    Director,
}

impl AgentId {
    pub const ALL: [AgentId; 6] = [
        AgentId::Cultural,
        AgentId::Behavioral,
        AgentId::Visual,
        AgentId::Growth,
        AgentId::Critic,
        AgentId::Director,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Cultural => "cultural_analyst",
            AgentId::Behavioral => "behavioral_analyst",
            AgentId::Visual => "visual_strategist",
            AgentId::Growth => "growth_strategist",
            AgentId::Critic => "critic",
            AgentId::Director => "director",
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static task definition: identity plus declared upstream dependencies.
pub struct AgentSpec {
    pub id: AgentId,
    pub depends_on: &'static [AgentId],
}

/// The dependency graph, in a valid topological order. The director is the
/// single terminal node and declares every other task upstream because its
/// prompt consumes all of their outputs.
pub const PIPELINE: [AgentSpec; 6] = [
    AgentSpec { id: AgentId::Cultural, depends_on: &[] },
    AgentSpec { id: AgentId::Behavioral, depends_on: &[] },
    AgentSpec {
        id: AgentId::Visual,
        depends_on: &[AgentId::Cultural, AgentId::Behavioral],
    },
    AgentSpec { id: AgentId::Growth, depends_on: &[AgentId::Visual] },
    AgentSpec { id: AgentId::Critic, depends_on: &[AgentId::Growth] },
    AgentSpec {
        id: AgentId::Director,
        depends_on: &[
            AgentId::Cultural,
            AgentId::Behavioral,
            AgentId::Visual,
            AgentId::Growth,
            AgentId::Critic,
        ],
    },
];

fn deps_of(id: AgentId) -> &'static [AgentId] {
    PIPELINE
        .iter()
        .find(|spec| spec.id == id)
        .map(|spec| spec.depends_on)
        .unwrap_or(&[])
}

/// Structural checks on `PIPELINE`: topological order (acyclic) and exactly
/// one terminal node that every other task can reach.
pub fn validate_pipeline() -> Result<(), String> {
    let mut seen: Vec<AgentId> = Vec::new();
    for spec in &PIPELINE {
        for dep in spec.depends_on {
            if !seen.contains(dep) {
                return Err(format!("{} depends on {} which is not upstream", spec.id, dep));
            }
        }
        seen.push(spec.id);
    }

    let terminals: Vec<AgentId> = PIPELINE
        .iter()
        .filter(|spec| !PIPELINE.iter().any(|s| s.depends_on.contains(&spec.id)))
        .map(|spec| spec.id)
        .collect();
    if terminals != vec![AgentId::Director] {
        return Err(format!("expected the director as sole terminal, found {terminals:?}"));
    }

    // Every non-terminal must be reachable from the terminal.
    let mut reachable = vec![AgentId::Director];
    let mut frontier = vec![AgentId::Director];
    while let Some(id) = frontier.pop() {
        for dep in deps_of(id) {
            if !reachable.contains(dep) {
                reachable.push(*dep);
                frontier.push(*dep);
            }
        }
    }
    for spec in &PIPELINE {
        if !reachable.contains(&spec.id) {
            return Err(format!("{} is not reachable from the director", spec.id));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Running,
    Done,
    Failed,
}

/// Per-turn task state machine: `pending → running → {done | failed}`.
/// `start` refuses to run a task whose dependencies are not all done, which
/// would indicate a scheduling bug rather than a provider problem.
struct TaskBoard {
    states: HashMap<AgentId, TaskState>,
}

impl TaskBoard {
    fn new() -> Self {
        Self {
            states: AgentId::ALL
                .into_iter()
                .map(|id| (id, TaskState::Pending))
                .collect(),
        }
    }

    fn start(&mut self, id: AgentId) -> AppResult<()> {
        let blocked: Vec<AgentId> = deps_of(id)
            .iter()
            .filter(|dep| self.states.get(dep) != Some(&TaskState::Done))
            .copied()
            .collect();
        if !blocked.is_empty() {
            return Err(AppError::Internal(format!(
                "{id} scheduled before dependencies completed: {blocked:?}"
            )));
        }
        self.states.insert(id, TaskState::Running);
        Ok(())
    }

    fn finish(&mut self, id: AgentId) {
        self.states.insert(id, TaskState::Done);
    }

    fn fail(&mut self, id: AgentId) {
        self.states.insert(id, TaskState::Failed);
    }
}

/// One user turn, immutable for the duration of the request.
#[derive(Debug, Clone)]
pub struct Turn {
    pub text: String,
    pub image: Option<ImageData>,
    pub history: Vec<ChatMessage>,
}

/// Injected collaborators the pipeline runs against.
#[derive(Clone)]
pub struct AgencyDeps {
    pub generator: Arc<dyn TextGenerator>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub cache: Arc<AgentCache>,
    pub retry: RetryConfig,
}

/// Run the whole agency for one turn, emitting progress and the director's
/// incremental prose into `sink`. Returns the director's full text so the
/// caller can run the state extractor exactly once, after terminal success.
pub async fn run_agency_pipeline(
    deps: &AgencyDeps,
    turn: &Turn,
    sink: &FrameSink,
) -> AppResult<String> {
    info!(turn_len = turn.text.len(), "agency turn started");

    // Optional augmentation. "No URL", "fetch failed" and "page unreadable"
    // all land here as `page == None` and change nothing downstream.
    let page = match detect_url(&turn.text) {
        Some(url) => {
            sink.log(format!("Reading {url} for brand context"));
            let page = deps.fetcher.fetch(&url).await;
            match &page {
                Some(p) => sink.log(format!("Pulled brand context from {}", p.url)),
                None => sink.log("The page could not be read; continuing without it"),
            }
            page
        }
        None => None,
    };

    // Cached generic answers must never mask fresh page-derived analysis.
    let cacheable_input = if page.is_none() {
        Some(turn.text.as_str())
    } else {
        None
    };

    let image = turn
        .image
        .clone()
        .or_else(|| page.as_ref().and_then(|p| p.image.clone()));

    let board = Mutex::new(TaskBoard::new());

    let cultural_prompt = cultural::build_prompt(&turn.text, page.as_ref());
    let behavioral_prompt = behavioral::build_prompt(&turn.text, page.as_ref());

    let (cultural_report, behavioral_report) = tokio::join!(
        run_expert(
            deps,
            &board,
            sink,
            AgentId::Cultural,
            cultural::PERSONA,
            cultural_prompt,
            cacheable_input,
            image.as_ref(),
        ),
        run_expert(
            deps,
            &board,
            sink,
            AgentId::Behavioral,
            behavioral::PERSONA,
            behavioral_prompt,
            cacheable_input,
            image.as_ref(),
        ),
    );
    let cultural_report = cultural_report?;
    let behavioral_report = behavioral_report?;

    let visual_report = run_expert(
        deps,
        &board,
        sink,
        AgentId::Visual,
        visual::PERSONA,
        visual::build_prompt(&turn.text, &cultural_report, &behavioral_report),
        None,
        None,
    )
    .await?;

    let growth_report = run_expert(
        deps,
        &board,
        sink,
        AgentId::Growth,
        growth::PERSONA,
        growth::build_prompt(&turn.text, &cultural_report, &behavioral_report, &visual_report),
        None,
        None,
    )
    .await?;

    let critique = run_expert(
        deps,
        &board,
        sink,
        AgentId::Critic,
        critic::PERSONA,
        critic::build_prompt(&visual_report),
        None,
        None,
    )
    .await?;
    // Delivered whole so the client can render it in its own panel.
    sink.critic_report(&critique);

    run_director(
        deps,
        &board,
        sink,
        &director::DirectorInputs {
            turn: &turn.text,
            history: &turn.history,
            cultural_report: &cultural_report,
            behavioral_report: &behavioral_report,
            visual_report: &visual_report,
            growth_report: &growth_report,
            critique: &critique,
        },
    )
    .await
}

/// Run one non-terminal expert: state transitions, cache consultation for
/// root tasks, retried provider call, progress events.
#[allow(clippy::too_many_arguments)]
async fn run_expert(
    deps: &AgencyDeps,
    board: &Mutex<TaskBoard>,
    sink: &FrameSink,
    id: AgentId,
    persona: &str,
    prompt: String,
    cacheable_input: Option<&str>,
    image: Option<&ImageData>,
) -> AppResult<String> {
    board.lock().unwrap().start(id)?;
    sink.agent_start(id);
    info!(agent = %id, "agent running");

    if let Some(input) = cacheable_input {
        if let Some(hit) = deps.cache.get(id, input) {
            sink.log(format!("{} reused a recent analysis", id.as_str()));
            board.lock().unwrap().finish(id);
            sink.agent_done(id);
            return Ok(hit);
        }
    }

    let retry_sink = sink.clone();
    let result = with_retry(
        &deps.retry,
        id.as_str(),
        |attempt, delay| {
            retry_sink.log(format!(
                "{} hit a transient provider error; retry {} in {}ms",
                id.as_str(),
                attempt,
                delay.as_millis()
            ));
        },
        || deps.generator.generate(persona, &prompt, image),
    )
    .await;

    match result {
        Ok(report) => {
            if let Some(input) = cacheable_input {
                deps.cache.put(id, input, &report);
            }
            board.lock().unwrap().finish(id);
            sink.agent_done(id);
            info!(agent = %id, report_len = report.len(), "agent done");
            Ok(report)
        }
        Err(e) => {
            board.lock().unwrap().fail(id);
            warn!(agent = %id, error = %e, "agent failed, aborting turn");
            Err(AppError::Provider(e))
        }
    }
}

/// The terminal task. The only one whose output streams incrementally; the
/// retry budget covers establishing the stream, a failure mid-stream aborts.
async fn run_director(
    deps: &AgencyDeps,
    board: &Mutex<TaskBoard>,
    sink: &FrameSink,
    inputs: &director::DirectorInputs<'_>,
) -> AppResult<String> {
    use futures::StreamExt;

    let id = AgentId::Director;
    board.lock().unwrap().start(id)?;
    sink.agent_start(id);
    info!(agent = %id, "agent running");

    let prompt = director::build_prompt(inputs);
    let retry_sink = sink.clone();
    let stream = with_retry(
        &deps.retry,
        id.as_str(),
        |attempt, delay| {
            retry_sink.log(format!(
                "{} hit a transient provider error; retry {} in {}ms",
                id.as_str(),
                attempt,
                delay.as_millis()
            ));
        },
        || deps.generator.generate_stream(director::PERSONA, &prompt),
    )
    .await;

    let mut stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            board.lock().unwrap().fail(id);
            return Err(AppError::Provider(e));
        }
    };

    let mut full = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(delta) => {
                sink.text_delta(&delta);
                full.push_str(&delta);
            }
            Err(e) => {
                board.lock().unwrap().fail(id);
                warn!(agent = %id, error = %e, "stream failed mid-synthesis");
                return Err(AppError::Provider(e));
            }
        }
    }

    if full.is_empty() {
        board.lock().unwrap().fail(id);
        return Err(AppError::PipelineAborted("director produced no text".to_string()));
    }

    board.lock().unwrap().finish(id);
    sink.agent_done(id);
    info!(agent = %id, response_len = full.len(), "agency turn complete");
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::ScrapedPage;
    use crate::stream::{EventName, StreamFrame};
    use crate::types::ProviderError;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};
    use url::Url;

    const DIRECTOR_TEXT: &[&str] = &[
        "# Coffee Club - Master Brand Blueprint\n\n## 1. Strategic Summary\nA weekday ritual for people who refuse sad desk coffee.\n\n",
        "```json\n{\"brand_name\":\"Coffee Club\",\"brand_dna\":{\"purpose\":\"Make weekday mornings feel chosen\",",
        "\"values\":[\"craft\",\"calm\"],\"usp\":\"roaster-direct subscriptions\"}}\n```",
    ];

    /// Scripted provider: records per-persona call windows, optionally fails.
    struct StubGenerator {
        /// (agent tag, started, finished) per non-streaming call.
        calls: Mutex<Vec<(String, Instant, Instant)>>,
        delay: Duration,
        /// Fail every `generate` call for this persona tag with this error.
        fail_tag: Option<(String, fn() -> ProviderError)>,
        /// Fail the first N cultural calls transiently, then succeed.
        transient_failures: AtomicU32,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay: Duration::from_millis(20),
                fail_tag: None,
                transient_failures: AtomicU32::new(0),
            }
        }

        fn failing(tag: &str, error: fn() -> ProviderError) -> Self {
            Self {
                fail_tag: Some((tag.to_string(), error)),
                ..Self::new()
            }
        }

        fn tag_for(persona: &str) -> String {
            for (needle, tag) in [
                ("Sociologist", "cultural"),
                ("Neuro-Marketing", "behavioral"),
                ("Visual Architect", "visual"),
                ("Growth Strategist", "growth"),
                ("Auditor", "critic"),
                ("Creative Director", "director"),
            ] {
                if persona.contains(needle) {
                    return tag.to_string();
                }
            }
            "unknown".to_string()
        }

        fn calls_for(&self, tag: &str) -> Vec<(Instant, Instant)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _, _)| t == tag)
                .map(|(_, s, e)| (*s, *e))
                .collect()
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(
            &self,
            persona: &str,
            _prompt: &str,
            _image: Option<&ImageData>,
        ) -> Result<String, ProviderError> {
            let tag = Self::tag_for(persona);
            let started = Instant::now();
            tokio::time::sleep(self.delay).await;

            if let Some((fail_tag, make_error)) = &self.fail_tag {
                if *fail_tag == tag {
                    return Err(make_error());
                }
            }
            if tag == "cultural" {
                let remaining = self.transient_failures.load(Ordering::SeqCst);
                if remaining > 0 {
                    self.transient_failures.fetch_sub(1, Ordering::SeqCst);
                    return Err(ProviderError::RateLimited("stub quota".into()));
                }
            }

            self.calls
                .lock()
                .unwrap()
                .push((tag.clone(), started, Instant::now()));
            Ok(format!("{tag} report"))
        }

        async fn generate_stream(
            &self,
            persona: &str,
            _prompt: &str,
        ) -> Result<crate::llm::TextStream, ProviderError> {
            let tag = Self::tag_for(persona);
            let started = Instant::now();
            self.calls
                .lock()
                .unwrap()
                .push((tag, started, Instant::now()));
            let chunks: Vec<Result<String, ProviderError>> = DIRECTOR_TEXT
                .iter()
                .map(|c| Ok(c.to_string()))
                .collect();
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    struct NoPage;

    #[async_trait]
    impl PageFetcher for NoPage {
        async fn fetch(&self, _url: &Url) -> Option<ScrapedPage> {
            None
        }
    }

    struct FixedPage(ScrapedPage);

    #[async_trait]
    impl PageFetcher for FixedPage {
        async fn fetch(&self, _url: &Url) -> Option<ScrapedPage> {
            Some(self.0.clone())
        }
    }

    fn deps_with(generator: Arc<StubGenerator>, fetcher: Arc<dyn PageFetcher>) -> AgencyDeps {
        AgencyDeps {
            generator,
            fetcher,
            cache: Arc::new(AgentCache::new(Duration::from_secs(3600))),
            retry: RetryConfig {
                max_retries: 3,
                base_delay: Duration::from_millis(1),
                jitter: false,
            },
        }
    }

    fn coffee_turn() -> Turn {
        Turn {
            text: "We sell a subscription box for artisanal coffee targeting young professionals"
                .to_string(),
            image: None,
            history: Vec::new(),
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<StreamFrame>) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn event_position(frames: &[StreamFrame], event: EventName, meta: &str) -> Option<usize> {
        frames.iter().position(|f| {
            matches!(f, StreamFrame::ControlEvent { event: e, meta: m }
                if *e == event && m.as_deref() == Some(meta))
        })
    }

    #[test]
    fn test_pipeline_graph_is_valid() {
        validate_pipeline().unwrap();
    }

    #[test]
    fn test_board_refuses_premature_start() {
        let mut board = TaskBoard::new();
        assert!(board.start(AgentId::Visual).is_err());
        board.start(AgentId::Cultural).unwrap();
        board.finish(AgentId::Cultural);
        assert!(board.start(AgentId::Visual).is_err());
        board.start(AgentId::Behavioral).unwrap();
        board.finish(AgentId::Behavioral);
        board.start(AgentId::Visual).unwrap();
    }

    #[tokio::test]
    async fn test_roots_run_concurrently_before_visual() {
        let generator = Arc::new(StubGenerator::new());
        let deps = deps_with(generator.clone(), Arc::new(NoPage));
        let (sink, mut rx) = FrameSink::channel();

        run_agency_pipeline(&deps, &coffee_turn(), &sink).await.unwrap();
        let frames = drain(&mut rx);

        // Both roots start before either is done: concurrent, not sequential.
        let cultural = generator.calls_for("cultural")[0];
        let behavioral = generator.calls_for("behavioral")[0];
        assert!(cultural.0 < behavioral.1 && behavioral.0 < cultural.1);

        // Visual starts only after both roots have finished.
        let visual = generator.calls_for("visual")[0];
        assert!(visual.0 >= cultural.1);
        assert!(visual.0 >= behavioral.1);

        // The event stream tells the same story.
        let visual_start = event_position(&frames, EventName::AgentStart, "visual_strategist").unwrap();
        for root in ["cultural_analyst", "behavioral_analyst"] {
            assert!(event_position(&frames, EventName::AgentStart, root).unwrap() < visual_start);
            assert!(event_position(&frames, EventName::AgentDone, root).unwrap() < visual_start);
        }
    }

    #[tokio::test]
    async fn test_end_to_end_coffee_scenario() {
        let generator = Arc::new(StubGenerator::new());
        let deps = deps_with(generator, Arc::new(NoPage));
        let (sink, mut rx) = FrameSink::channel();

        let full_text = run_agency_pipeline(&deps, &coffee_turn(), &sink).await.unwrap();
        let frames = drain(&mut rx);

        // CRITIC_REPORT arrives before the terminal AGENT_DONE.
        let critic_report = frames
            .iter()
            .position(|f| matches!(f, StreamFrame::ControlEvent { event: EventName::CriticReport, .. }))
            .unwrap();
        let director_done = event_position(&frames, EventName::AgentDone, "director").unwrap();
        assert!(critic_report < director_done);

        // The streamed deltas reassemble into the returned text.
        let streamed: Vec<u8> = frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::TextDelta(bytes) => Some(bytes.to_vec()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(String::from_utf8(streamed).unwrap(), full_text);

        // The extractor pass yields a non-empty purpose and values.
        let mut aggregate = crate::models::BrandIdentity::default();
        assert!(crate::extract::apply_update(&mut aggregate, &full_text));
        assert!(!aggregate.brand_dna.purpose.is_empty());
        assert!(!aggregate.brand_dna.values.is_empty());
    }

    #[tokio::test]
    async fn test_non_terminal_failure_aborts_without_synthesis() {
        let generator = Arc::new(StubGenerator::failing("behavioral", || {
            ProviderError::Auth("revoked key".into())
        }));
        let deps = deps_with(generator.clone(), Arc::new(NoPage));
        let (sink, mut rx) = FrameSink::channel();

        let result = run_agency_pipeline(&deps, &coffee_turn(), &sink).await;
        assert!(result.is_err());
        let frames = drain(&mut rx);

        // No partial synthesis: the director never starts and no text flows.
        assert!(event_position(&frames, EventName::AgentStart, "director").is_none());
        assert!(!frames.iter().any(|f| matches!(f, StreamFrame::TextDelta(_))));
        assert!(generator.calls_for("director").is_empty());
    }

    #[tokio::test]
    async fn test_root_results_are_cached_across_turns() {
        let generator = Arc::new(StubGenerator::new());
        let deps = deps_with(generator.clone(), Arc::new(NoPage));

        let (sink, _rx) = FrameSink::channel();
        run_agency_pipeline(&deps, &coffee_turn(), &sink).await.unwrap();
        let (sink, mut rx) = FrameSink::channel();
        run_agency_pipeline(&deps, &coffee_turn(), &sink).await.unwrap();
        let frames = drain(&mut rx);

        // Second turn served the roots from cache: one provider call each.
        assert_eq!(generator.calls_for("cultural").len(), 1);
        assert_eq!(generator.calls_for("behavioral").len(), 1);
        // Dependent tasks are never cached.
        assert_eq!(generator.calls_for("visual").len(), 2);

        // Cached roots still emit their start/done pair.
        assert!(event_position(&frames, EventName::AgentStart, "cultural_analyst").is_some());
        assert!(event_position(&frames, EventName::AgentDone, "cultural_analyst").is_some());
    }

    #[tokio::test]
    async fn test_page_context_bypasses_cache() {
        let page = ScrapedPage {
            url: "https://roast.example/".to_string(),
            title: "Roast & Co".to_string(),
            description: String::new(),
            text: "We roast beans in small batches for subscribers.".to_string(),
            image_url: None,
            image: None,
        };
        let generator = Arc::new(StubGenerator::new());
        let deps = deps_with(generator.clone(), Arc::new(FixedPage(page)));
        let turn = Turn {
            text: "analyze https://roast.example/ for me".to_string(),
            image: None,
            history: Vec::new(),
        };

        let (sink, _rx) = FrameSink::channel();
        run_agency_pipeline(&deps, &turn, &sink).await.unwrap();
        let (sink, _rx) = FrameSink::channel();
        run_agency_pipeline(&deps, &turn, &sink).await.unwrap();

        // Fresh page analysis both times: nothing consulted, nothing stored.
        assert_eq!(generator.calls_for("cultural").len(), 2);
        assert!(deps.cache.get(AgentId::Cultural, &turn.text).is_none());
    }

    #[tokio::test]
    async fn test_unreadable_page_keeps_cache_in_play() {
        // The URL is present but the page is below the minimum viable length,
        // so the fetcher yields None and caching behaves as if no URL existed.
        let generator = Arc::new(StubGenerator::new());
        let deps = deps_with(generator.clone(), Arc::new(NoPage));
        let turn = Turn {
            text: "analyze https://thin.example/ for me".to_string(),
            image: None,
            history: Vec::new(),
        };

        let (sink, _rx) = FrameSink::channel();
        run_agency_pipeline(&deps, &turn, &sink).await.unwrap();
        let (sink, _rx) = FrameSink::channel();
        run_agency_pipeline(&deps, &turn, &sink).await.unwrap();

        assert_eq!(generator.calls_for("cultural").len(), 1);
        assert!(deps.cache.get(AgentId::Cultural, &turn.text).is_some());
    }

    #[tokio::test]
    async fn test_retry_notice_reaches_the_stream() {
        let generator = Arc::new(StubGenerator::new());
        generator.transient_failures.store(1, Ordering::SeqCst);
        let deps = deps_with(generator, Arc::new(NoPage));
        let (sink, mut rx) = FrameSink::channel();

        run_agency_pipeline(&deps, &coffee_turn(), &sink).await.unwrap();
        let frames = drain(&mut rx);

        assert!(frames.iter().any(|f| matches!(
            f,
            StreamFrame::ControlEvent { event: EventName::AgentLog, meta: Some(m) }
                if m.contains("retry")
        )));
    }
}
