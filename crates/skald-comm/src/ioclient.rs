//! Byte-stream glue for a Bifrost client.
//!
//! An [`IoClient`] pumps a duplex byte connection in and out of a
//! [`BifrostClient`]: the reader half tokenises incoming bytes into
//! messages and forwards them; the writer half packs outgoing messages and
//! writes them. Failures on either side are reported on an error channel
//! and tear down this connection only, never the controller.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use skald_proto::{Message, Tokenizer};

use crate::bifrost::BifrostClient;
use crate::error::CommError;

/// How many bytes to pull off the connection per read.
const READ_BUFFER_SIZE: usize = 4096;

/// A Bifrost client bound to an I/O connection.
pub struct IoClient<R, W> {
    reader: R,
    writer: W,
    bifrost: BifrostClient,
}

impl<R, W> IoClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Binds `bifrost` to the given connection halves.
    #[must_use]
    pub fn new(reader: R, writer: W, bifrost: BifrostClient) -> Self {
        Self {
            reader,
            writer,
            bifrost,
        }
    }

    /// Runs the reader and writer loops until the connection or the
    /// adapter goes away, reporting errors on `err_tx`.
    ///
    /// The error channel closes once both loops have finished.
    pub async fn run(self, err_tx: mpsc::Sender<CommError>) {
        let Self {
            mut reader,
            mut writer,
            bifrost,
        } = self;
        let (msg_tx, mut msg_rx, done) = bifrost.into_parts();

        let read_loop = async {
            let mut tokenizer = Tokenizer::new();
            let mut buf = [0u8; READ_BUFFER_SIZE];
            loop {
                let n = tokio::select! {
                    _ = done.cancelled() => break,
                    read = reader.read(&mut buf) => match read {
                        Ok(0) => {
                            debug!("connection closed by peer");
                            break;
                        }
                        Ok(n) => n,
                        Err(e) => {
                            report(&err_tx, &done, e.into()).await;
                            break;
                        }
                    },
                };

                for line in tokenizer.feed(&buf[..n]) {
                    let message = match Message::from_line(&line) {
                        Ok(message) => message,
                        Err(e) => {
                            // A peer that can't frame a message gets cut
                            // off; resynchronising mid-stream is guesswork.
                            report(&err_tx, &done, e.into()).await;
                            return;
                        }
                    };

                    let delivered = tokio::select! {
                        _ = done.cancelled() => false,
                        sent = msg_tx.send(message) => sent.is_ok(),
                    };
                    if !delivered {
                        report(&err_tx, &done, CommError::HungUp).await;
                        return;
                    }
                }
            }
            report(&err_tx, &done, CommError::HungUp).await;
        };

        let write_loop = async {
            while let Some(message) = msg_rx.recv().await {
                if let Err(e) = writer.write_all(&message.pack()).await {
                    report(&err_tx, &done, e.into()).await;
                    break;
                }
                if let Err(e) = writer.flush().await {
                    report(&err_tx, &done, e.into()).await;
                    break;
                }
            }
        };

        tokio::join!(read_loop, write_loop);
    }
}

/// Reports an error, unless the adapter is already gone and nobody cares.
async fn report(err_tx: &mpsc::Sender<CommError>, done: &CancellationToken, err: CommError) {
    tokio::select! {
        _ = done.cancelled() => {}
        _ = err_tx.send(err) => {}
    }
}
