//! The TCP server.
//!
//! One acceptor loop; per connection, a copy of the root client is wired
//! through a Bifrost adapter into an [`IoClient`] pumping the socket.
//! Connection failures tear down their own connection and nothing else.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use skald_comm::{Client, CommError, IoClient};

/// A running TCP server for one controller.
pub struct NetServer {
    listener: TcpListener,
    /// Copied once per incoming connection.
    root: Client,
    ct: CancellationToken,
    /// Whether per-connection lifecycle events are logged.
    log: bool,
}

impl NetServer {
    /// Binds the server to `host`.
    ///
    /// # Errors
    ///
    /// Whatever the bind itself raises.
    pub async fn bind(
        host: &str,
        root: Client,
        ct: CancellationToken,
        log: bool,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(host).await?;
        Ok(Self {
            listener,
            root,
            ct,
            log,
        })
    }

    /// The address the server actually bound, for `host:0` setups.
    ///
    /// # Errors
    ///
    /// Whatever the socket lookup raises.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until cancelled or the listener fails.
    ///
    /// The root client's response channel is drained here too: broadcasts
    /// sent to it have no reader of their own, and an undrained client
    /// would eventually stall the controller's broadcast path.
    pub async fn run(mut self) {
        info!(addr = ?self.local_addr(), "net server listening");
        loop {
            tokio::select! {
                _ = self.ct.cancelled() => break,

                response = self.root.recv() => {
                    // Broadcasts are drained and dropped; a closed channel
                    // means the controller stopped and there is nothing
                    // left to serve.
                    if response.is_none() {
                        break;
                    }
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = self.new_connection(stream, addr).await {
                            warn!(%addr, error = %e, "couldn't register connection");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "couldn't accept connections");
                        break;
                    }
                },
            }
        }
        info!("net server stopped");
    }

    /// Wires up one incoming connection.
    async fn new_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> Result<(), CommError> {
        if self.log {
            info!(%addr, "new connection");
        }

        let client = self.root.copy(&self.ct).await?;
        let (adapter, bifrost_client) = client.bifrost(&self.ct).await?;
        tokio::spawn(adapter.run());

        let (reader, writer) = stream.into_split();
        let io_client = IoClient::new(reader, writer, bifrost_client);

        let (err_tx, mut err_rx) = mpsc::channel(1);
        tokio::spawn(io_client.run(err_tx));

        // Connection errors only concern this connection; log and move on.
        let log = self.log;
        tokio::spawn(async move {
            while let Some(e) = err_rx.recv().await {
                match e {
                    CommError::HungUp if log => info!(%addr, "connection closed"),
                    CommError::HungUp => {}
                    e => warn!(%addr, error = %e, "connection error"),
                }
            }
            debug!(%addr, "connection finished");
        });

        Ok(())
    }
}
