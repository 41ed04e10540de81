use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use anyhow::{Context, anyhow};
use tracing::{debug, error, warn};
use tungstenite::WebSocket;

const PREFERRED_PORT: u16 = 1337;
const MAX_CLIENTS: usize = 10;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Websocket hub telling connected pages to reload.
///
/// Pages opt in through the snippet returned by [`LiveReload::script`], which
/// the dev server injects into every proxied HTML response.
pub struct LiveReload {
    port: u16,
    tx: Sender<()>,
}

impl LiveReload {
    /// Bind the websocket listener and start serving clients. Without an
    /// explicit port 1337 is tried first, then any free port.
    pub fn start(port: Option<u16>) -> anyhow::Result<Self> {
        let (tcp, port) = reserve_port(port)?;
        let clients = Clients::default();

        let _incoming = new_thread_ws_incoming(tcp, clients.clone())?;
        let (tx, _outgoing) = new_thread_ws_reload(clients)?;

        debug!("live reload listening on port {port}");
        Ok(Self { port, tx })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Ask every connected page to reload.
    pub fn broadcast(&self) -> anyhow::Result<()> {
        self.tx
            .send(())
            .map_err(|_| anyhow!("the live-reload server has stopped"))
    }

    pub fn script(&self) -> String {
        script(self.port)
    }
}

/// Client snippet connecting back to the hub on `port`.
pub fn script(port: u16) -> String {
    format!(
        r#"<script>
const socket = new WebSocket("ws://localhost:{port}");
socket.addEventListener("message", event => {{
    window.location.reload();
}});
</script>"#
    )
}

/// Insert `script` right before the closing body tag, or append it when the
/// document has none.
pub fn inject_script(html: &[u8], script: &str) -> Vec<u8> {
    const NEEDLE: &[u8] = b"</body>";

    let at = html
        .windows(NEEDLE.len())
        .rposition(|window| window.eq_ignore_ascii_case(NEEDLE))
        .unwrap_or(html.len());

    let mut out = Vec::with_capacity(html.len() + script.len());
    out.extend_from_slice(&html[..at]);
    out.extend_from_slice(script.as_bytes());
    out.extend_from_slice(&html[at..]);
    out
}

fn reserve_port(port: Option<u16>) -> anyhow::Result<(TcpListener, u16)> {
    let listener = match port {
        Some(port) => TcpListener::bind(("127.0.0.1", port))
            .with_context(|| format!("binding live reload to port {port}"))?,
        None => match TcpListener::bind(("127.0.0.1", PREFERRED_PORT)) {
            Ok(sock) => sock,
            Err(_) => TcpListener::bind("127.0.0.1:0")?,
        },
    };

    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

fn new_thread_ws_incoming(server: TcpListener, clients: Clients) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("reload-accept".into())
        .spawn(move || {
            for stream in server.incoming() {
                let socket = match stream.map_err(anyhow::Error::from).and_then(|stream| {
                    tungstenite::accept(stream).map_err(|e| anyhow!("handshake failed: {e}"))
                }) {
                    Ok(socket) => socket,
                    Err(e) => {
                        warn!("live reload: {e}");
                        continue;
                    }
                };

                clients
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(socket);
            }
        })
}

fn new_thread_ws_reload(clients: Clients) -> std::io::Result<(Sender<()>, JoinHandle<()>)> {
    let (tx, rx) = std::sync::mpsc::channel();

    let thread = std::thread::Builder::new()
        .name("reload-notify".into())
        .spawn(move || {
            while rx.recv().is_ok() {
                let mut clients = clients.lock().unwrap_or_else(PoisonError::into_inner);
                let mut broken = vec![];

                for (i, socket) in clients.iter_mut().enumerate() {
                    match socket.send("reload".into()) {
                        Ok(_) => {}
                        Err(tungstenite::error::Error::Io(e))
                            if e.kind() == std::io::ErrorKind::BrokenPipe =>
                        {
                            broken.push(i);
                        }
                        Err(tungstenite::error::Error::ConnectionClosed)
                        | Err(tungstenite::error::Error::AlreadyClosed) => broken.push(i),
                        Err(e) => error!("live reload: {e:?}"),
                    }
                }

                for i in broken.into_iter().rev() {
                    clients.remove(i);
                }

                // Only the most recent tabs are kept
                let len = clients.len();
                if len > MAX_CLIENTS {
                    for mut socket in clients.drain(0..len - MAX_CLIENTS) {
                        socket.close(None).ok();
                    }
                }

                debug!("reload sent to {} pages", clients.len());
            }
        })?;

    Ok((tx, thread))
}
