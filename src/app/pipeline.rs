use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::artifact_store::{ArtifactBuilder, ArtifactStore};
use crate::app::model::{GenerationRecord, GenerationRequest, GenerationStatus};
use crate::app::queue::InProcessQueue;
use crate::app::status_store::{Outcome, StatusStore};
use crate::error::{
    GatewayError, GenerationError, NotFoundError, Stage, StatusError, ValidationError,
};
use crate::formats::SlideOutline;
use crate::gemini::ModelGateway;
use crate::outline::{self, OutlineParser};
use crate::prompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub id: String,
    pub path: PathBuf,
}

type StageResult<T> = Result<T, (Stage, anyhow::Error)>;

/// Prompt -> model -> outline parser -> artifact, with the outcome of each
/// generation recorded in a [`StatusStore`].
#[derive(Clone)]
pub struct GenerationPipeline {
    gateway: Arc<dyn ModelGateway>,
    status_store: Arc<dyn StatusStore>,
    builder: Arc<dyn ArtifactBuilder>,
    artifact_store: Arc<dyn ArtifactStore>,
    parser: OutlineParser,
    queue: InProcessQueue,
}

impl GenerationPipeline {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        status_store: Arc<dyn StatusStore>,
        builder: Arc<dyn ArtifactBuilder>,
        artifact_store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            gateway,
            status_store,
            builder,
            artifact_store,
            parser: OutlineParser::default(),
            queue: InProcessQueue::default(),
        }
    }

    pub fn with_parser(mut self, parser: OutlineParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_queue(mut self, queue: InProcessQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Runs a whole generation in the caller's task and returns the stored
    /// artifact.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let slide_count = request.validate()?;
        let id = self.start_record(request).await?;
        let path = self.run_to_completion(&id, request, slide_count).await?;
        Ok(GeneratedArtifact { id, path })
    }

    /// Records the generation and runs it on the in-process queue. Returns the
    /// id to poll with [`Self::status`].
    pub async fn submit(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let slide_count = request.validate()?;
        let id = self.start_record(&request).await?;

        let pipeline = self.clone();
        let task_id = id.clone();
        self.queue.spawn(async move {
            // The outcome is recorded in the status store.
            let _ = pipeline
                .run_to_completion(&task_id, &request, slide_count)
                .await;
        });

        Ok(id)
    }

    /// Asks for an outline-only reply and parses it. Nothing is recorded.
    pub async fn preview_outline(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<SlideOutline>, GenerationError> {
        let slide_count = request.validate()?;
        let prompt = prompt::outline_prompt(&request.topic, slide_count, request.description());
        self.complete_and_parse(&prompt).await
    }

    /// Slides grounded in `document`. Nothing is recorded.
    pub async fn generate_from_document(
        &self,
        document: &str,
        topic: &str,
        slide_count: u32,
    ) -> Result<Vec<SlideOutline>, GenerationError> {
        if document.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "document" }.into());
        }
        let slide_count = GenerationRequest::new(topic, slide_count).validate()?;
        let prompt = prompt::document_prompt(document, topic, slide_count);
        self.complete_and_parse(&prompt).await
    }

    pub async fn improve_prompt(
        &self,
        original: &str,
        context: Option<&str>,
    ) -> Result<String, GatewayError> {
        let prompt = prompt::improvement_prompt(original, context);
        let improved = self.gateway.complete(&prompt).await?;
        Ok(improved.trim().to_owned())
    }

    pub async fn status(&self, id: &str) -> Result<GenerationStatus, StatusError> {
        Ok(self.record(id).await?.status)
    }

    pub async fn record(&self, id: &str) -> Result<GenerationRecord, StatusError> {
        self.status_store
            .get(id)
            .await
            .map_err(StatusError::Store)?
            .ok_or_else(|| NotFoundError { id: id.to_owned() }.into())
    }

    pub async fn delete_status(&self, id: &str) -> Result<(), StatusError> {
        self.status_store
            .remove(id)
            .await
            .map_err(StatusError::Store)
    }

    pub async fn list_all(&self) -> Result<BTreeMap<String, GenerationRecord>, StatusError> {
        self.status_store
            .snapshot()
            .await
            .map_err(StatusError::Store)
    }

    async fn start_record(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.status_store
            .insert(GenerationRecord::processing(&id, request.topic.trim()))
            .await
            .map_err(|source| GenerationError::Failed {
                id: id.clone(),
                stage: Stage::Status,
                source,
            })?;
        tracing::info!(id = %id, topic = %request.topic, "generation started");
        Ok(id)
    }

    async fn run_to_completion(
        &self,
        id: &str,
        request: &GenerationRequest,
        slide_count: u32,
    ) -> Result<PathBuf, GenerationError> {
        match self.run_stages(id, request, slide_count).await {
            Ok(path) => {
                self.status_store
                    .finish(
                        id,
                        Outcome::Completed {
                            artifact_path: path.clone(),
                        },
                    )
                    .await
                    .map_err(|source| GenerationError::Failed {
                        id: id.to_owned(),
                        stage: Stage::Status,
                        source,
                    })?;
                tracing::info!(id, path = %path.display(), "generation completed");
                Ok(path)
            }
            Err((stage, source)) => {
                let message = format!("{stage}: {source:#}");
                tracing::error!(id, %stage, error = %message, "generation failed");
                if let Err(err) = self
                    .status_store
                    .finish(id, Outcome::Failed { message })
                    .await
                {
                    tracing::warn!(id, error = %err, "could not record generation failure");
                }
                Err(GenerationError::Failed {
                    id: id.to_owned(),
                    stage,
                    source,
                })
            }
        }
    }

    async fn run_stages(
        &self,
        id: &str,
        request: &GenerationRequest,
        slide_count: u32,
    ) -> StageResult<PathBuf> {
        let prompt = prompt::content_prompt(&request.topic, slide_count, request.description());
        let raw = self
            .gateway
            .complete(&prompt)
            .await
            .map_err(|err| (Stage::Model, err.into()))?;

        let slides = self
            .parser
            .parse(&raw)
            .map_err(|err| (Stage::Parse, err.into()))?;
        log_outline(id, &slides);

        let temp_path = self
            .builder
            .build(&slides, &request.topic)
            .await
            .map_err(|err| (Stage::BuildArtifact, err))?;

        self.artifact_store
            .persist(&temp_path, id)
            .await
            .map_err(|err| (Stage::StoreArtifact, err))
    }

    async fn complete_and_parse(&self, prompt: &str) -> Result<Vec<SlideOutline>, GenerationError> {
        let raw = self
            .gateway
            .complete(prompt)
            .await
            .map_err(|err| GenerationError::Preview {
                stage: Stage::Model,
                source: err.into(),
            })?;
        self.parser
            .parse(&raw)
            .map_err(|err| GenerationError::Preview {
                stage: Stage::Parse,
                source: err.into(),
            })
    }
}

fn log_outline(id: &str, slides: &[SlideOutline]) {
    let invalid = slides.iter().filter(|s| !outline::is_valid(s)).count();
    if slides.is_empty() {
        tracing::warn!(id, "model reply contained no recognizable slides");
    } else {
        tracing::debug!(id, slides = slides.len(), invalid, "parsed outline");
    }
}
