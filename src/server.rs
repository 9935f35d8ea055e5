use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::{AllowList, Dispatcher};
use crate::dto::{RequestEnvelope, ResponseEnvelope};
use crate::snapshot::write_report;
use crate::stores::AccountStore;
use crate::wire::{deadline, write_frame, FrameReader};
use crate::Error;

/// Accepts connections and serves each one on its own task.
///
/// Connections share nothing but the dispatcher, and through it the store.
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
    idle_timeout: Option<Duration>,
}

impl Server {
    pub async fn bind(addr: impl ToSocketAddrs, dispatcher: Dispatcher) -> Result<Self, Error> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            dispatcher,
            idle_timeout: None,
        })
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self) -> Result<(), Error> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` completes. Connections already accepted keep
    /// running on their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            dispatcher,
            idle_timeout,
        } = self;
        info!(addr = %listener.local_addr()?, "server is running");

        let mut incoming = TcpListenerStream::new(listener);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
                accepted = incoming.next() => match accepted {
                    Some(Ok(stream)) => {
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move {
                            let peer = stream.peer_addr().ok();
                            debug!(?peer, "connection accepted");
                            match serve_connection(stream, dispatcher, idle_timeout).await {
                                Ok(()) => debug!(?peer, "connection closed"),
                                Err(err) => warn!(?peer, error = %err, "connection dropped"),
                            }
                        });
                    }
                    // Accept errors are per-connection; keep listening.
                    Some(Err(err)) => warn!(error = %err, "error accepting connection"),
                    None => break,
                },
            }
        }
        Ok(())
    }
}

/// Serves requests on one connection, one at a time, until the peer closes it.
///
/// A line that is not a request envelope (bad JSON, bad UTF-8, or over
/// [`MAX_FRAME_LEN`](crate::wire::MAX_FRAME_LEN)) gets a `malformed_payload`
/// error with id 0 and the connection stays open.
async fn serve_connection(
    stream: TcpStream,
    dispatcher: Dispatcher,
    idle_timeout: Option<Duration>,
) -> Result<(), Error> {
    let (reader, mut writer) = stream.into_split();
    let mut frames = FrameReader::new(reader);

    while let Some(frame) = deadline(idle_timeout, frames.next_frame()).await? {
        let request = match frame {
            Ok(frame) => serde_json::from_slice::<RequestEnvelope>(&frame)
                .map_err(|err| Error::MalformedPayload(err.to_string())),
            Err(err @ Error::FrameTooLong(_)) => Err(err),
            Err(err) => return Err(err),
        };
        let response = match request {
            Ok(request) => dispatcher.dispatch(request).await,
            Err(err) => {
                warn!(error = %err, "undecodable request");
                ResponseEnvelope::from_error(0, &err)
            }
        };
        write_frame(&mut writer, &response).await?;
    }
    Ok(())
}

/// Runs the server described by `config` until Ctrl-C, then writes the
/// balance report to `report` if configured.
pub async fn run<W: Write>(config: &ServerConfig, report: W) -> Result<(), Error> {
    let store = Arc::new(AccountStore::new());
    let mut dispatcher = Dispatcher::new(Arc::clone(&store));
    if !config.allowed_callers.is_empty() {
        info!(callers = ?config.allowed_callers, "restricting privileged operations");
        dispatcher = dispatcher.with_policy(AllowList::new(config.allowed_callers.iter().cloned()));
    }

    let server = Server::bind(config.listen.as_str(), dispatcher)
        .await?
        .with_idle_timeout(config.idle_timeout());
    server
        .serve_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    if config.report_on_shutdown {
        write_report(&store, report).await?;
    }
    Ok(())
}
