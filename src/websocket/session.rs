//! Per-viewer WebSocket session.

use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::debug;

use super::server::{Broadcaster, Connect, Disconnect, WsMessage};
use crate::AppState;

pub struct WsSession {
    /// Registry id, assigned on connect.
    id: usize,
    /// Last heartbeat response from the client.
    hb: Instant,
    server: Addr<Broadcaster>,
    ping_interval: Duration,
}

impl WsSession {
    pub fn new(server: Addr<Broadcaster>, ping_interval: Duration) -> Self {
        WsSession {
            id: 0,
            hb: Instant::now(),
            server,
            ping_interval,
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.ping_interval * 2;
        ctx.run_interval(self.ping_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                debug!("viewer heartbeat timed out");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
        self.server
            .send(Connect {
                addr: ctx.address().recipient(),
            })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(id) => act.id = id,
                    _ => ctx.stop(),
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.server.do_send(Disconnect { id: self.id });
        Running::Stop
    }
}

impl Handler<WsMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            // Viewers are push-only; anything they send is ignored.
            Ok(_) => {}
            Err(_) => ctx.stop(),
        }
    }
}

/// `GET /ws` upgrade handler.
pub async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let ping_interval = Duration::from_secs(state.config.websocket.ping_interval);
    ws::start(
        WsSession::new(state.broadcaster.clone(), ping_interval),
        &req,
        stream,
    )
}
