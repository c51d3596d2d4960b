//! TCP listener wrapper spawning one session task per connection

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::backend::{Authorizer, Backend};
use crate::config::Config;
use crate::error::Result;
use crate::session::Session;

/// POP3 server: a bound TCP listener plus the collaborators every session
/// shares
///
/// # Example
///
/// ```no_run
/// use pop3_rs::{Config, MemoryAuthorizer, MemoryBackend, Pop3Server};
/// use std::sync::Arc;
///
/// # async fn example() -> pop3_rs::Result<()> {
/// let mut authorizer = MemoryAuthorizer::new();
/// authorizer.add_user("john", "secret");
///
/// let server = Pop3Server::bind(
///     Config::new("0.0.0.0:110"),
///     Arc::new(authorizer),
///     Arc::new(MemoryBackend::new()),
/// )
/// .await?;
/// server.run().await
/// # }
/// ```
pub struct Pop3Server {
    listener: TcpListener,
    authorizer: Arc<dyn Authorizer>,
    backend: Arc<dyn Backend>,
    idle_timeout: Duration,
}

impl Pop3Server {
    /// Bind the listen address from the configuration
    pub async fn bind(
        config: Config,
        authorizer: Arc<dyn Authorizer>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        let listener = match TcpListener::bind(&config.bind).await {
            Ok(listener) => listener,
            Err(err) => {
                error!("could not listen on {}: {}", config.bind, err);
                return Err(err.into());
            }
        };
        info!("POP3 server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            authorizer,
            backend,
            idle_timeout: config.idle_timeout,
        })
    }

    /// Address the listener is bound to; useful when binding port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, running each session on its own task
    ///
    /// Accept errors are logged and do not stop the loop. Session errors are
    /// logged by the session task; one misbehaving client cannot affect the
    /// others.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!("could not accept connection: {}", err);
                    continue;
                }
            };

            debug!("accepted connection from {}", peer);
            let authorizer = Arc::clone(&self.authorizer);
            let backend = Arc::clone(&self.backend);
            let idle_timeout = self.idle_timeout;

            tokio::spawn(async move {
                let (read_half, write_half) = stream.into_split();
                let session = Session::new(
                    BufReader::new(read_half),
                    write_half,
                    authorizer,
                    backend,
                    idle_timeout,
                );
                if let Err(err) = session.serve().await {
                    warn!("session from {} ended with error: {}", peer, err);
                }
            });
        }
    }
}
