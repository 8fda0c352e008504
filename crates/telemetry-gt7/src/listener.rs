//! Blocking UDP receive loop on a dedicated thread.
//!
//! The socket is bound before the thread is spawned so bind failures surface
//! to the caller. Each datagram is handed synchronously to a
//! [`DatagramHandler`]; handler errors are logged and the loop continues.
//! Only a non-transient receive error ends the thread early.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use gt7_telemetry_core::{MAX_DATAGRAM_SIZE, telemetry_now};
use gt7_telemetry_errors::{ErrorCategory, ListenerError, TelemetryError};
use tracing::{debug, error, info, warn};

use crate::cipher::PacketType;

/// Port the console listens on for heartbeats.
pub const HEARTBEAT_PORT: u16 = 33739;

/// Receives every datagram read by the listener.
pub trait DatagramHandler: Send + 'static {
    /// Process one datagram stamped with its receipt time (Unix seconds).
    ///
    /// # Errors
    ///
    /// Any error is logged by the listener; it never stops the loop.
    fn handle_datagram(&mut self, timestamp: f64, datagram: &[u8]) -> Result<(), TelemetryError>;
}

/// Keep-alive sent to the console so it keeps streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub target: SocketAddr,
    pub interval: Duration,
    pub packet_type: PacketType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub bind_address: SocketAddr,
    /// Upper bound on how long a stop request can go unnoticed
    pub receive_timeout: Duration,
    pub heartbeat: Option<HeartbeatConfig>,
}

impl ListenerConfig {
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            receive_timeout: Duration::from_millis(500),
            heartbeat: None,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }
}

/// What the receive thread hands back when it ends.
#[derive(Debug)]
pub struct ListenerExit<H> {
    pub handler: H,
    /// Set when the loop ended on a fatal socket error rather than a stop request
    pub error: Option<ListenerError>,
}

/// A running UDP listener.
pub struct UdpListener<H: DatagramHandler> {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    thread: JoinHandle<ListenerExit<H>>,
}

impl<H: DatagramHandler> UdpListener<H> {
    /// Bind the socket and start the receive thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when binding, configuring the socket or
    /// spawning the thread fails.
    pub fn start(config: ListenerConfig, handler: H) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(config.bind_address)
            .map_err(|e| ListenerError::bind(config.bind_address.to_string(), e))?;

        let mut timeout = config.receive_timeout;
        if let Some(hb) = &config.heartbeat {
            timeout = timeout.min(hb.interval);
        }
        // A zero timeout is rejected by the OS; treat it as "poll often".
        let timeout = timeout.max(Duration::from_millis(1));
        socket
            .set_read_timeout(Some(timeout))
            .map_err(ListenerError::Configure)?;
        let local_addr = socket.local_addr().map_err(ListenerError::Configure)?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let heartbeat = config.heartbeat;
        let thread = thread::Builder::new()
            .name("gt7-udp-listener".to_string())
            .spawn(move || receive_loop(socket, handler, heartbeat, thread_running))
            .map_err(ListenerError::ThreadSpawn)?;

        info!(address = %local_addr, "Listening for GT7 telemetry");
        Ok(Self {
            local_addr,
            running,
            thread,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the receive thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Request a stop, join the thread and return the handler.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanicked`] if the thread panicked.
    pub fn stop(self) -> Result<ListenerExit<H>, ListenerError> {
        self.running.store(false, Ordering::Release);
        let exit = self
            .thread
            .join()
            .map_err(|_| ListenerError::ThreadPanicked)?;
        info!(address = %self.local_addr, "GT7 telemetry listener stopped");
        Ok(exit)
    }
}

fn receive_loop<H: DatagramHandler>(
    socket: UdpSocket,
    mut handler: H,
    heartbeat: Option<HeartbeatConfig>,
    running: Arc<AtomicBool>,
) -> ListenerExit<H> {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let mut last_heartbeat: Option<Instant> = None;
    let mut first = true;

    while running.load(Ordering::Acquire) {
        if let Some(hb) = &heartbeat
            && last_heartbeat.is_none_or(|t| t.elapsed() >= hb.interval)
        {
            if let Err(e) = socket.send_to(hb.packet_type.heartbeat(), hb.target) {
                warn!(target_addr = %hb.target, error = %e, "Failed to send heartbeat");
            }
            last_heartbeat = Some(Instant::now());
        }

        match socket.recv_from(&mut buf) {
            Ok((len, source)) => {
                if first {
                    info!(%source, len, "Received first datagram");
                    first = false;
                }
                if let Err(e) = handler.handle_datagram(telemetry_now(), &buf[..len]) {
                    match e.category() {
                        ErrorCategory::Decode => {
                            debug!(%source, len, error = %e, "Dropped datagram");
                        }
                        category => {
                            warn!(%source, %category, error = %e, "Datagram handler failed");
                        }
                    }
                }
            }
            Err(e) if is_timeout(&e) => {}
            Err(e) if is_transient(&e) => debug!(error = %e, "Transient receive error"),
            Err(e) => {
                error!(error = %e, "UDP receive failed, stopping listener");
                running.store(false, Ordering::Release);
                return ListenerExit {
                    handler,
                    error: Some(ListenerError::Receive(e)),
                };
            }
        }
    }

    ListenerExit {
        handler,
        error: None,
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// ICMP port-unreachable replies to a heartbeat surface as resets on some
/// platforms.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}
