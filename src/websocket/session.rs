use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web_actors::ws;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::websocket::{ConnectionId, ConnectionRegistry, ServerMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry message forwarded into the WebSocket actor
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Outbound(String);

/// Per-connection WebSocket actor
///
/// Holds the receiving end of the handle registered in the
/// [`ConnectionRegistry`]; registry fanout lands here and is written out to
/// the socket. The only recognized client input is a text `ping`, answered
/// with a `pong`; everything else is ignored.
pub struct WsSession {
    account_id: String,
    connection_id: ConnectionId,
    registry: ConnectionRegistry,
    receiver: Option<UnboundedReceiver<ServerMessage>>,
    initial_unread: u64,
    hb: Instant,
}

impl WsSession {
    pub fn new(
        account_id: String,
        connection_id: ConnectionId,
        registry: ConnectionRegistry,
        receiver: UnboundedReceiver<ServerMessage>,
        initial_unread: u64,
    ) -> Self {
        Self {
            account_id,
            connection_id,
            registry,
            receiver: Some(receiver),
            initial_unread,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(
                    "websocket heartbeat timed out for account {}, disconnecting",
                    act.account_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send_message(&self, message: &ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match message.to_json() {
            Ok(text) => ctx.text(text),
            Err(err) => error!("failed to encode websocket message: {}", err),
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("websocket session started for account {}", self.account_id);

        self.hb(ctx);

        // First frame on the wire is always the connected envelope with the
        // current unread count.
        let connected = ServerMessage::connected(self.account_id.clone(), self.initial_unread);
        self.send_message(&connected, ctx);

        // Bridge registry fanout into this actor. The receiver is dropped
        // when the task ends, which is what flags this handle as dead to
        // any in-flight broadcast.
        if let Some(mut receiver) = self.receiver.take() {
            let addr = ctx.address();
            tokio::spawn(async move {
                while let Some(message) = receiver.recv().await {
                    match message.to_json() {
                        Ok(text) => addr.do_send(Outbound(text)),
                        Err(err) => error!("failed to encode websocket message: {}", err),
                    }
                }
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("websocket session stopped for account {}", self.account_id);

        let registry = self.registry.clone();
        let account_id = self.account_id.clone();
        let connection_id = self.connection_id;
        actix::spawn(async move {
            registry.disconnect(&account_id, connection_id).await;
        });
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                if text.trim() == "ping" {
                    self.send_message(&ServerMessage::pong(), ctx);
                }
                // `ping` is the only client-to-server message type;
                // anything else is ignored.
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("ignoring binary websocket frame from {}", self.account_id);
            }
            Ok(ws::Message::Close(reason)) => {
                info!(
                    "websocket close received for account {}: {:?}",
                    self.account_id, reason
                );
                ctx.stop();
            }
            Err(err) => {
                warn!(
                    "websocket protocol error for account {}: {}",
                    self.account_id, err
                );
                ctx.stop();
            }
            _ => {}
        }
    }
}
