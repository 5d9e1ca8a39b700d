// WebSocket transport for the prediction service.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::protocol;
use crate::service::Service;

/// Bind the listener on `127.0.0.1:{port}`. Port 0 picks a free port.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, serving each on its own task.
pub async fn serve(listener: TcpListener, service: Arc<Service>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let addr = addr.to_string();
        info!("Accepted TCP connection from {addr}");

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr}: {e}");
                    return;
                }
            };

            let (write, read) = ws_stream.split();
            let handler = |text: &str| protocol::dispatch(&service, text);
            match process_message_stream(read, write, &addr, handler).await {
                Ok(replies) => info!("Client {addr} disconnected after {replies} requests"),
                Err(e) => warn!("Failed to reply to {addr}: {e}"),
            }
        });
    }
}

/// Bind and serve; runs until the task is cancelled or the process exits.
pub async fn run(port: u16, service: Arc<Service>) -> anyhow::Result<()> {
    let listener = bind(port).await?;
    serve(listener, service).await
}

/// Answer every text frame from `stream` with one reply frame on `sink`.
///
/// Binary, ping and pong frames are ignored. A close frame or a transport
/// error ends the connection. Returns the number of replies sent, or the
/// sink's error if a reply could not be written.
///
/// Generic over the stream and sink so it can be tested with in-memory
/// values without opening TCP ports.
pub async fn process_message_stream<St, Si, F>(
    mut stream: St,
    mut sink: Si,
    addr: &str,
    mut handler: F,
) -> Result<usize, Si::Error>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
    Si: Sink<Message> + Unpin,
    F: FnMut(&str) -> String,
{
    let mut replies = 0;
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                debug!("Request from {addr}: {} bytes", text.len());
                let reply = handler(text.as_str());
                sink.send(Message::Text(reply.into())).await?;
                replies += 1;
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(replies)
}
