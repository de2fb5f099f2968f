//! The bridge serves host hook calls over a pair of byte streams, one JSON line each way.
use eyre::Result;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::command::CommandOutcome;
use crate::plugin::{COMMAND_HANDLED_SENTINEL, Plugin};
use crate::protocol::{
    ProtocolError, Request, Response, read_frame_from_stream, write_frame_to_stream,
};

/// Run one hook and build its reply.
pub async fn serve_one_request(plugin: &mut Plugin, request: Request) -> Response {
    match request {
        Request::Config { mut config } => {
            plugin.configure(&mut config);
            Response::Config { config }
        }
        Request::CommandExecuteBefore { input } => {
            let outcome = plugin.command_execute_before(&input).await;
            let handled = outcome == CommandOutcome::Handled;
            Response::CommandExecuteBefore {
                handled,
                sentinel: handled.then(|| COMMAND_HANDLED_SENTINEL.to_string()),
            }
        }
        Request::MessagesTransform { input, mut output } => {
            plugin.transform_messages(&input, &mut output.messages);
            Response::MessagesTransform {
                messages: output.messages,
            }
        }
    }
}

/// Serve requests until the host closes its end.
pub async fn serve<R, W>(plugin: &mut Plugin, reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!("bridge: serving hooks");
    let mut line = String::new();

    loop {
        let request: std::result::Result<Request, ProtocolError> =
            read_frame_from_stream(reader, &mut line).await;

        let response = match request {
            Ok(request) => serve_one_request(plugin, request).await,
            Err(ProtocolError::Disconnect) => {
                tracing::info!("bridge: host closed the stream");
                return Ok(());
            }
            Err(ProtocolError::Decode(e)) => {
                tracing::warn!(error = %e, "bridge: malformed request");
                Response::Error {
                    message: e.to_string(),
                }
            }
            Err(e @ ProtocolError::Io(_)) => return Err(e.into()),
        };

        write_frame_to_stream(writer, &response).await?;
    }
}
