//! Sequential pipeline driver.

use super::policy::FailurePolicy;
use super::state::PipelineState;
use crate::backends::{CompletionBackend, FileRenderBackend, RenderBackend, SearchBackend};
use crate::config::PaperflowConfig;
use crate::core::{GenerationRequest, Phase, ProgressEvent};
use crate::errors::PaperflowError;
use crate::events::{ChannelEventSink, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::stages::{DraftComposer, Refiner, RenderAdapter, SourceCollector, Stage};
use crate::utils::iso_timestamp;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Runs the retrieve, write, refine and render stages in order.
///
/// Each run owns its [`PipelineState`]; the orchestrator itself holds no
/// per-run data and can serve concurrent requests.
#[derive(Debug)]
pub struct Orchestrator {
    config: PaperflowConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl Orchestrator {
    /// Creates an orchestrator wired to the given collaborators.
    #[must_use]
    pub fn new(
        config: PaperflowConfig,
        completion: Arc<dyn CompletionBackend>,
        search: Arc<dyn SearchBackend>,
        render: Arc<dyn RenderBackend>,
    ) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(SourceCollector::new(
                search,
                config.retrieval.clone(),
                config.retry.clone(),
            )),
            Box::new(DraftComposer::new(
                Arc::clone(&completion),
                config.drafting.clone(),
                config.retry.clone(),
            )),
            Box::new(Refiner::new(
                completion,
                config.refinement.clone(),
                config.retry.clone(),
            )),
            Box::new(RenderAdapter::new(
                render,
                config.rendering.clone(),
                config.retry.clone(),
            )),
        ];
        Self { config, stages }
    }

    /// Creates an orchestrator that writes Markdown files under
    /// `config.rendering.output_dir`.
    #[must_use]
    pub fn with_file_renderer(
        config: PaperflowConfig,
        completion: Arc<dyn CompletionBackend>,
        search: Arc<dyn SearchBackend>,
    ) -> Self {
        let render = Arc::new(FileRenderBackend::from_config(&config.rendering));
        Self::new(config, completion, search, render)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PaperflowConfig {
        &self.config
    }

    /// Returns the phases in execution order.
    #[must_use]
    pub fn phases(&self) -> Vec<Phase> {
        self.stages.iter().map(|s| s.phase()).collect()
    }

    /// Runs the whole chain and returns the final state.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::InvalidRequest`] if the request is rejected
    /// up front. Stage failures never surface here; they are recorded in the
    /// returned state.
    pub async fn run(&self, request: GenerationRequest) -> Result<PipelineState, PaperflowError> {
        self.run_with_sink(request, &NoOpEventSink).await
    }

    /// Runs the whole chain, reporting each transition to `sink`.
    ///
    /// Events are emitted in stage-completion order. A `result` event, when
    /// one is emitted, is always last.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::InvalidRequest`] if the request is rejected
    /// up front.
    pub async fn run_with_sink(
        &self,
        request: GenerationRequest,
        sink: &dyn EventSink,
    ) -> Result<PipelineState, PaperflowError> {
        if let Err(err) = request.validate() {
            warn!(error = %err, "Rejecting generation request");
            sink.emit(ProgressEvent::failure(None, &err)).await;
            return Err(err);
        }

        let state = PipelineState::new(request);
        let span = info_span!(
            "pipeline",
            run_id = %state.run_id,
            fingerprint = %state.fingerprint,
        );
        Ok(self.drive(state, sink).instrument(span).await)
    }

    async fn drive(&self, mut state: PipelineState, sink: &dyn EventSink) -> PipelineState {
        let timer = SpanTimer::start("pipeline");
        info!(
            topic = %state.request.topic,
            target_length = state.request.target_length,
            started_at = %iso_timestamp(),
            "Starting generation"
        );
        sink.emit(ProgressEvent::log(format!(
            "Starting generation for: {}",
            state.request.topic
        )))
        .await;

        for stage in &self.stages {
            let phase = stage.phase();
            state.phase = phase;
            let stage_timer = SpanTimer::start(phase.to_string());

            match stage.execute(&state).await {
                Ok(output) => {
                    for warning in &output.warnings {
                        warn!(stage = %phase, error = %warning, "Recoverable stage failure");
                        state.record_error(warning);
                    }
                    state.apply(output.delta);
                    state.phase = phase.next();
                    debug!(
                        stage = %phase,
                        duration_ms = stage_timer.finish(),
                        "Stage completed"
                    );
                    sink.emit(ProgressEvent::stage_log(phase, output.summary, output.data))
                        .await;
                }
                Err(err) => {
                    state.record_error(&err);
                    let policy = self.config.policies.for_phase(phase);

                    let substitute = match policy {
                        FailurePolicy::AbortOnError => {
                            error!(stage = %phase, %policy, error = %err, "Stage failed, aborting run");
                            state.fail();
                            state.elapsed_seconds = timer.elapsed_secs();
                            sink.emit(ProgressEvent::failure(Some(phase), &err)).await;
                            if state.has_partial_output() {
                                sink.emit(ProgressEvent::Result(state.summary())).await;
                            }
                            return state;
                        }
                        FailurePolicy::ContinueWithPlaceholder => stage.placeholder(&state, &err),
                        FailurePolicy::ContinueWithFallback => stage.fallback(&state, &err),
                    };

                    warn!(stage = %phase, %policy, error = %err, "Stage failed, continuing");
                    if let Some(delta) = substitute {
                        state.apply(delta);
                    }
                    state.phase = phase.next();
                    sink.emit(ProgressEvent::stage_log(
                        phase,
                        format!("Stage {phase} failed, continuing: {err}"),
                        serde_json::Value::Null,
                    ))
                    .await;
                }
            }
        }

        state.complete();
        state.elapsed_seconds = timer.finish() / 1000.0;
        info!(
            status = %state.status,
            elapsed_seconds = state.elapsed_seconds,
            errors = state.errors.len(),
            "Generation finished"
        );
        sink.emit(ProgressEvent::log(format!(
            "Research generation complete in {:.2} sec.",
            state.elapsed_seconds
        )))
        .await;
        sink.emit(ProgressEvent::Result(state.summary())).await;
        state
    }

    /// Runs the chain on a background task and yields its progress events.
    ///
    /// The stream ends after the last event. Events become visible as soon
    /// as each stage completes; the channel holds at most
    /// `config.stream_buffer` undelivered events.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn stream(self: &Arc<Self>, request: GenerationRequest) -> BoxStream<'static, ProgressEvent> {
        let (sink, receiver) = ChannelEventSink::channel(self.config.stream_buffer);
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            if let Err(err) = orchestrator.run_with_sink(request, &sink).await {
                debug!(error = %err, "Streaming run rejected");
            }
        });

        stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
        .boxed()
    }
}
