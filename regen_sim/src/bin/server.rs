use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{info, warn};

use regen_protocol::{encode_event, parse_command_line, SessionEvent};
use regen_sim::{
    load_catalog_from_env, FileAssetResolver, Inbound, RegenServerConfig, SessionId,
    SessionRegistry, SessionServer,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RegenServerConfig::from_env();
    let (catalog, catalog_metadata) = load_catalog_from_env();
    let assets = Arc::new(FileAssetResolver::new(config.asset_root.clone()));
    let registry = SessionRegistry::new(catalog, assets).with_base_seed(config.session_seed);

    let inbound_rx = match spawn_listener(config.bind) {
        Ok(receiver) => receiver,
        Err(err) => {
            tracing::error!(
                target: "regen_sim::server",
                bind = %config.bind,
                error = %err,
                "server.bind_failed"
            );
            return;
        }
    };

    info!(
        target: "regen_sim::server",
        bind = %config.bind,
        asset_root = %config.asset_root.display(),
        catalog = catalog_metadata
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "builtin".to_string()),
        seeded = config.session_seed.is_some(),
        "Regeneration lab session server ready"
    );

    SessionServer::new(registry).run(inbound_rx);
}

fn spawn_listener(bind_addr: SocketAddr) -> io::Result<Receiver<Inbound>> {
    let listener = TcpListener::bind(bind_addr)?;
    let (sender, receiver) = unbounded::<Inbound>();
    thread::spawn(move || loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!(target: "regen_sim::server", %addr, "client.connected");
                let sender = sender.clone();
                thread::spawn(move || handle_client(stream, addr, sender));
            }
            Err(err) => {
                warn!(
                    target: "regen_sim::server",
                    error = %err,
                    "client.accept_failed"
                );
                thread::sleep(Duration::from_millis(200));
            }
        }
    });
    Ok(receiver)
}

fn handle_client(stream: TcpStream, addr: SocketAddr, sender: Sender<Inbound>) {
    if let Err(err) = stream.set_nodelay(true) {
        warn!(target: "regen_sim::server", %addr, error = %err, "client.nodelay_failed");
    }
    let write_half = match stream.try_clone() {
        Ok(clone) => clone,
        Err(err) => {
            warn!(target: "regen_sim::server", %addr, error = %err, "client.clone_failed");
            return;
        }
    };

    let (outbox, events) = unbounded::<SessionEvent>();
    let (ack, ack_rx) = bounded::<SessionId>(1);
    if sender.send(Inbound::Open { outbox, ack }).is_err() {
        return;
    }
    let Ok(session) = ack_rx.recv() else {
        return;
    };
    thread::spawn(move || write_events(write_half, addr, events));

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse_command_line(trimmed) {
                    Ok(payload) => {
                        if sender.send(Inbound::Command { session, payload }).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(
                            target: "regen_sim::server",
                            %session,
                            input = trimmed,
                            error = %err,
                            "command.invalid"
                        );
                        let invalid = Inbound::Invalid {
                            session,
                            message: err.to_string(),
                        };
                        if sender.send(invalid).is_err() {
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(target: "regen_sim::server", %session, error = %err, "client.read_failed");
                break;
            }
        }
    }

    info!(target: "regen_sim::server", %addr, %session, "client.disconnected");
    let _ = sender.send(Inbound::Close { session });
}

fn write_events(stream: TcpStream, addr: SocketAddr, events: Receiver<SessionEvent>) {
    let mut writer = BufWriter::new(stream);
    for event in events {
        let line = match encode_event(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!(target: "regen_sim::server", %addr, error = %err, "event.encode_failed");
                continue;
            }
        };
        let written = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());
        if let Err(err) = written {
            warn!(target: "regen_sim::server", %addr, error = %err, "client.write_failed");
            break;
        }
    }
}
