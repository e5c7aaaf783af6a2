//! Engine side of the session server.
//!
//! Connection threads turn socket lines into [`Inbound`] messages; a single
//! [`SessionServer`] consumes them in arrival order, so every reply for a
//! session (including parse errors) leaves in the order its command came in.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use regen_protocol::{CommandPayload, SessionEvent};
use tracing::warn;

use crate::dispatch::{dispatch, settle, Reply};
use crate::dwell::DwellScheduler;
use crate::sessions::{SessionId, SessionRegistry};

#[derive(Debug)]
pub enum Inbound {
    Open {
        outbox: Sender<SessionEvent>,
        ack: Sender<SessionId>,
    },
    Command {
        session: SessionId,
        payload: CommandPayload,
    },
    /// A line that failed to parse; answered with an error in sequence.
    Invalid {
        session: SessionId,
        message: String,
    },
    Close {
        session: SessionId,
    },
}

#[derive(Debug, Clone, Copy)]
struct SettleTicket {
    session: SessionId,
    epoch: u64,
}

pub struct SessionServer {
    registry: SessionRegistry,
    outboxes: HashMap<SessionId, Sender<SessionEvent>>,
    dwell: DwellScheduler<SettleTicket>,
}

impl SessionServer {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            outboxes: HashMap::new(),
            dwell: DwellScheduler::new(),
        }
    }

    /// Time the engine may block before the next dwell follow-up is due.
    pub fn next_timeout(&self, now: Instant) -> Option<Duration> {
        self.dwell.timeout_from(now)
    }

    /// Consumes `inbound` until every sender is gone.
    ///
    /// Waits on the channel no longer than the next dwell deadline, so one
    /// session's animation never delays another session's commands.
    pub fn run(mut self, inbound: Receiver<Inbound>) {
        loop {
            let received = match self.next_timeout(Instant::now()) {
                Some(timeout) => match inbound.recv_timeout(timeout) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match inbound.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };
            if let Some(message) = received {
                self.handle(message, Instant::now());
            }
            self.settle_due(Instant::now());
        }
        tracing::info!(
            target: "regen_sim::server",
            open_sessions = self.registry.len(),
            "server.stopped"
        );
    }

    pub fn handle(&mut self, message: Inbound, now: Instant) {
        match message {
            Inbound::Open { outbox, ack } => {
                let session = self.registry.open();
                if outbox.send(SessionEvent::Session { id: session.0 }).is_err()
                    || ack.send(session).is_err()
                {
                    self.registry.close(session);
                    return;
                }
                self.outboxes.insert(session, outbox);
            }
            Inbound::Command { session, payload } => {
                let Some(controller) = self.registry.get_mut(session) else {
                    warn!(
                        target: "regen_sim::server",
                        %session,
                        "command.rejected=unknown_session"
                    );
                    return;
                };
                let reply = dispatch(controller, payload);
                self.deliver(session, reply, now);
            }
            Inbound::Invalid { session, message } => {
                let reply = Reply {
                    events: vec![SessionEvent::Error { message }],
                    ..Reply::default()
                };
                self.deliver(session, reply, now);
            }
            Inbound::Close { session } => {
                self.outboxes.remove(&session);
                self.registry.close(session);
            }
        }
    }

    /// Sends the steady frame for every dwell that elapsed and is still current.
    pub fn settle_due(&mut self, now: Instant) {
        for ticket in self.dwell.pop_due(now) {
            if !self.registry.presentation_is_current(ticket.session, ticket.epoch) {
                tracing::debug!(
                    target: "regen_sim::server",
                    session = %ticket.session,
                    epoch = ticket.epoch,
                    "dwell.superseded"
                );
                continue;
            }
            let Some(controller) = self.registry.get_mut(ticket.session) else {
                continue;
            };
            let reply = settle(controller);
            self.deliver(ticket.session, reply, now);
        }
    }

    fn deliver(&mut self, session: SessionId, reply: Reply, now: Instant) {
        if reply.presented {
            if let Some(epoch) = self.registry.begin_presentation(session) {
                if let Some(dwell) = reply.settle_after {
                    self.dwell.schedule_after(SettleTicket { session, epoch }, now, dwell);
                }
            }
        }
        let Some(outbox) = self.outboxes.get(&session) else {
            return;
        };
        for event in reply.events {
            if outbox.send(event).is_err() {
                warn!(
                    target: "regen_sim::server",
                    %session,
                    "session.outbox_closed"
                );
                break;
            }
        }
    }
}
