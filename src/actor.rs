use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use tracing::error;
use tracing_error::SpanTrace;

#[derive(Debug, thiserror::Error)]
pub struct Error {
    source: ErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Fatal(anyhow::Error),
    #[error(transparent)]
    NonFatal(#[from] anyhow::Error),
}

impl Error {
    /// A fatal error stops the actor it surfaces in; process shutdown is up
    /// to whoever watches the actor's termination.
    pub fn fatal(error: impl Into<anyhow::Error>) -> Self {
        Self {
            source: ErrorKind::Fatal(error.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, fmt)
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(source: E) -> Self {
        Self {
            source: ErrorKind::from(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

pub fn handle_error(error: Box<dyn StdError + Send + Sync>) -> bool {
    match error.downcast_ref::<Error>() {
        Some(e) => {
            let stop_actor = matches!(&e.source, ErrorKind::Fatal(_));

            error!(
                %stop_actor,
                "ActorError: {:?} SpanTrace: {}",
                e.source, e.span_trace
            );

            stop_actor
        }
        None => {
            error!(stop_actor = false, "ActorError: {:?}", error);

            false
        }
    }
}

/// Detaches a piece of work from the loop that triggered it. Failures end up
/// in the log instead of the spawning loop.
pub fn spawn_logged<F>(task: &'static str, fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = fut.await {
            error!(task = task, "DetachedTaskError: {:?}", error);
        }
    });
}
