//! The graph actor: a single-consumer mailbox around one session.
//!
//! One tokio task owns the engine and drains commands in arrival
//! order. Handler errors become error responses; the consumer itself
//! never dies on a bad command. Long waits (a human thinking about a
//! candidate) are not modeled as blocked calls — the engine answers
//! with its current candidate list and the reviewer posts
//! `add_feedback` later.

use std::path::PathBuf;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use reid_core::{EngineParams, EntityId, Error, ReviewLog, Result};
use reid_engine::{AllPairs, ReviewEngine, ScoreOracle};

use crate::protocol::{parse_aids, parse_feedback, split_action, AidSelection};

/// Produces the score oracle for a freshly started session. The
/// classifier lives outside this crate; the factory is the seam it is
/// injected through.
pub type ScorerFactory = Box<dyn Fn() -> Box<dyn ScoreOracle> + Send>;

/// File name of the persisted review log inside `dbdir`.
const REVIEW_LOG_FILE: &str = "reviews.jsonl";

struct Command {
    payload: Value,
    respond: oneshot::Sender<Result<Value>>,
}

/// Client handle: post JSON payloads, await JSON responses.
#[derive(Clone)]
pub struct GraphClient {
    tx: mpsc::UnboundedSender<Command>,
}

impl GraphClient {
    /// Post a command payload and wait for the engine's response.
    ///
    /// The payload must be a JSON object with an `action` key; anything
    /// else is rejected client-side without touching the mailbox.
    pub async fn post(&self, payload: Value) -> Result<Value> {
        if !payload
            .as_object()
            .map(|o| o.contains_key("action"))
            .unwrap_or(false)
        {
            return Err(Error::UnknownAction(
                "payload must be a dict with an action".to_string(),
            ));
        }
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(Command { payload, respond })
            .map_err(|_| Error::Internal("graph actor is gone".to_string()))?;
        rx.await
            .map_err(|_| Error::Internal("graph actor dropped the request".to_string()))?
    }
}

/// The mailbox worker owning one (optional, until `start`) session.
pub struct GraphActor {
    engine: Option<ReviewEngine>,
    scorer_factory: ScorerFactory,
}

impl GraphActor {
    /// Spawn the consumer task and return the posting handle. The
    /// actor lives until every client handle is dropped.
    pub fn spawn(scorer_factory: ScorerFactory) -> GraphClient {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        tokio::spawn(async move {
            let mut actor = GraphActor {
                engine: None,
                scorer_factory,
            };
            while let Some(Command { payload, respond }) = rx.recv().await {
                let response = actor.handle(payload).await;
                if let Err(e) = &response {
                    error!(error = %e, "command failed");
                }
                // A caller that abandoned its request is not an actor
                // problem.
                let _ = respond.send(response);
            }
            info!("graph actor shutting down");
        });
        GraphClient { tx }
    }

    /// Dispatch one command. Every error is returned to the caller;
    /// none of them kill the mailbox.
    async fn handle(&mut self, payload: Value) -> Result<Value> {
        let (action, body) = split_action(&payload)?;
        debug!(action = %action, "handling command");
        match action.as_str() {
            "start" => self.start(body).await,
            "refresh" => {
                let engine = self.engine_mut()?;
                engine.refresh_candidates().await?;
                Ok(serde_json::to_value(engine.continue_review())?)
            }
            "continue_review" => {
                let engine = self.engine_mut()?;
                Ok(serde_json::to_value(engine.continue_review())?)
            }
            "add_feedback" => {
                let feedback = parse_feedback(body)?;
                let engine = self.engine_mut()?;
                let delta = engine.apply_feedback(feedback)?;
                let next = engine.peek_candidates(1).into_iter().next();
                Ok(json!({
                    "status": "accepted",
                    "meaningful": delta.is_meaningful(),
                    "next": next,
                }))
            }
            "logs" => {
                let engine = self.engine_mut()?;
                Ok(serde_json::to_value(engine.logs())?)
            }
            "wait" => {
                let num = body.get("num").and_then(|v| v.as_f64()).unwrap_or(0.0);
                tokio::time::sleep(std::time::Duration::from_secs_f64(num.max(0.0))).await;
                Ok(Value::Object(body))
            }
            // `debug` predates `status`; both return the introspection
            // snapshot, serialized since a live handle cannot cross the
            // wire.
            "status" | "debug" => {
                let engine = self.engine_mut()?;
                Ok(serde_json::to_value(engine.status())?)
            }
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }

    async fn start(&mut self, body: serde_json::Map<String, Value>) -> Result<Value> {
        if self.engine.is_some() {
            return Err(Error::AlreadyStarted);
        }
        let dbdir = body
            .get("dbdir")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Serialization("start requires 'dbdir'".to_string()))?;
        let params: EngineParams = match body.get("config") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => EngineParams::default(),
        };
        let log_path = PathBuf::from(dbdir).join(REVIEW_LOG_FILE);
        let log = ReviewLog::open(&log_path)?;

        let entities: Vec<EntityId> = match parse_aids(body.get("aids"))? {
            AidSelection::Ids(ids) => ids,
            AidSelection::All => {
                // Adopt every entity the persisted log has seen.
                let mut ids: Vec<EntityId> = log
                    .records()
                    .iter()
                    .flat_map(|r| {
                        let (u, v) = r.feedback.edge.endpoints();
                        [u, v]
                    })
                    .collect();
                ids.sort();
                ids.dedup();
                ids
            }
        };

        let mut engine = ReviewEngine::new(
            params,
            (self.scorer_factory)(),
            Box::new(AllPairs),
            log,
        );
        engine.start(&entities)?;
        info!(
            entity_count = entities.len(),
            dbdir = %dbdir,
            "session started"
        );
        self.engine = Some(engine);
        Ok(json!("started"))
    }

    fn engine_mut(&mut self) -> Result<&mut ReviewEngine> {
        self.engine.as_mut().ok_or(Error::NotStarted)
    }
}
