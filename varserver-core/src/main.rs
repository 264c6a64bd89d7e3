//! `varserverd`: the broker daemon. Owns the single-threaded dispatch loop
//! that serializes every client request against the engine (§5), logging
//! and configuration wired up the way the teacher's agent binary does it.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use log::{error, info, warn};

use varserver_core::config::ConfigManager;
use varserver_core::{ClientReplyHandle, Engine, Envelope, HandlerOutcome, Listener, Response};
use varserver_types::ClientId;

fn find_config_file() -> PathBuf {
    if let Some(cfg) = env::var_os("VARSERVER_CONFIG") {
        return PathBuf::from(cfg);
    }
    let mut exe_path = env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    exe_path.pop();
    exe_path.push("varserver.toml");
    exe_path
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = find_config_file();
    let cfg_mgr = ConfigManager::new(&config_path)?;
    let config = cfg_mgr.get();

    let log_spec = format!("varserver_core={}", config.logging.level);
    let _logger = varserver_core::logger::init_logger(&log_spec, &config.logging.directory)?;
    info!("configuration loaded from {}", config_path.display());

    let mut engine = Engine::new(config.server.max_variables, config.server.notify_queue_len);
    let listener = Listener::new();
    let mut reply_handles: HashMap<ClientId, ClientReplyHandle> = HashMap::new();

    // A platform acceptor (UNIX socket, named pipe, ...) calls
    // `engine.open_session(credentials, requested_len)` to get a `ClientId`,
    // then `listener.connect(client_id)`, keeps the returned `ClientChannel`
    // on the wire side, and hands the `ClientReplyHandle` to this loop via
    // `reply_handles`. None is wired up here since the concrete transport is
    // left pluggable; this loop only owns serialization against the engine.
    info!("varserverd ready, max_variables={}", config.server.max_variables);

    loop {
        let envelope = match listener.recv() {
            Ok(envelope) => envelope,
            Err(_) => {
                warn!("all client channels dropped, shutting down");
                break;
            }
        };

        match envelope {
            Envelope::Request { client, credentials, request } => {
                match engine.dispatch(client, &credentials, request) {
                    Ok(HandlerOutcome::Done(response)) => {
                        if let Some(reply) = reply_handles.get(&client) {
                            let _ = reply.reply(response);
                        }
                    }
                    Ok(HandlerOutcome::Deferred(transaction)) => {
                        info!("client {client} deferred as transaction {transaction}");
                    }
                    Err(e) => {
                        error!("request from client {client} failed: {e}");
                        if let Some(reply) = reply_handles.get(&client) {
                            let _ = reply.reply(Response::Unit);
                        }
                    }
                }
                for (target, response) in engine.drain_pushes() {
                    if let Some(reply) = reply_handles.get(&target) {
                        let _ = reply.reply(response);
                    }
                }
            }
            Envelope::Close { client } => {
                reply_handles.remove(&client);
                for orphaned in engine.client_closed(client) {
                    warn!(
                        "client {client} closed while serving a transaction; unblocking requester {} with {}",
                        orphaned.requester, orphaned.error
                    );
                }
            }
        }
    }

    Ok(())
}
