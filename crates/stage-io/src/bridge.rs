//! Serial link carried over TCP.
//!
//! Each chunk read from the socket is treated like bytes landing in the UART
//! receive FIFO: the line receiver runs over it as the interrupt handler
//! would, and its echoes go straight back to the peer.

use crate::metrics::{BRIDGE_CONNECTED, BRIDGE_LISTENING, RX_BYTES};
use stage_core::receiver::SENTINEL;
use stage_core::{LineReceiver, SerialPort};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("socket setup failed: {0}")]
    Socket(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: String,
    pub poll_interval: Duration,
    /// Echo bytes the emulated transmitter accepts per interrupt.
    pub tx_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7100".to_string(),
            poll_interval: Duration::from_millis(2),
            tx_capacity: 32,
        }
    }
}

/// UART view over one received chunk and the client socket.
struct TcpUart<'a> {
    rx: &'a [u8],
    pos: usize,
    stream: &'a mut TcpStream,
    tx_budget: usize,
    failed: bool,
}

impl<'a> TcpUart<'a> {
    fn new(rx: &'a [u8], stream: &'a mut TcpStream, tx_budget: usize) -> Self {
        Self {
            rx,
            pos: 0,
            stream,
            tx_budget,
            failed: false,
        }
    }
}

impl SerialPort for TcpUart<'_> {
    fn byte_available(&mut self) -> bool {
        self.pos < self.rx.len()
    }

    fn read_byte(&mut self) -> u8 {
        match self.rx.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                byte
            }
            None => SENTINEL,
        }
    }

    fn try_write_byte(&mut self, byte: u8) -> bool {
        if self.failed || self.tx_budget == 0 {
            return false;
        }
        match self.stream.write(&[byte]) {
            Ok(1) => {
                self.tx_budget -= 1;
                true
            }
            Ok(_) => false,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => false,
            Err(err) => {
                debug!(error = %err, "Echo write failed");
                self.failed = true;
                false
            }
        }
    }
}

/// Listening end of the serial link. One client at a time.
pub struct SerialBridge {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: BridgeConfig,
}

impl SerialBridge {
    pub fn bind(config: BridgeConfig) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(&config.bind_addr).map_err(|source| BridgeError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        BRIDGE_LISTENING.set(1.0);
        info!(addr = %local_addr, tx_capacity = config.tx_capacity, "Serial bridge listening");
        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the bridge on its own thread. `wake` is unparked whenever a line
    /// completes, the way the UART interrupt ends the main loop's `wfi`.
    pub fn spawn(
        self,
        receiver: LineReceiver,
        wake: Thread,
        stop: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        thread::spawn(move || self.run(receiver, wake, &stop))
    }

    pub fn run(self, mut receiver: LineReceiver, wake: Thread, stop: &AtomicBool) {
        let mut client: Option<TcpStream> = None;
        let mut chunk = [0u8; 256];

        while !stop.load(Ordering::Relaxed) {
            if client.is_none() {
                client = self.accept();
            }

            let mut drop_client = false;
            if let Some(stream) = client.as_mut() {
                match stream.read(&mut chunk) {
                    Ok(0) => {
                        info!("Serial client disconnected");
                        drop_client = true;
                    }
                    Ok(n) => {
                        RX_BYTES.inc_by(n as u64);
                        let mut uart = TcpUart::new(&chunk[..n], stream, self.config.tx_capacity);
                        let outcome = receiver.on_rx(&mut uart);
                        drop_client = uart.failed;
                        trace!(
                            bytes = outcome.bytes_read,
                            line = outcome.line_completed,
                            truncated = outcome.truncated,
                            busy_drops = outcome.busy_drops,
                            echo_drops = outcome.echo_drops,
                            "Receive interrupt"
                        );
                        if outcome.line_completed {
                            wake.unpark();
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                    Err(err) => {
                        warn!(error = %err, "Serial client read error");
                        drop_client = true;
                    }
                }
            }

            if drop_client {
                client = None;
                BRIDGE_CONNECTED.set(0.0);
                let discarded = receiver.discard_partial();
                if discarded > 0 {
                    debug!(bytes = discarded, "Discarded unfinished line from closed client");
                }
            }

            thread::sleep(self.config.poll_interval);
        }

        BRIDGE_LISTENING.set(0.0);
        BRIDGE_CONNECTED.set(0.0);
        info!("Serial bridge stopped");
    }

    fn accept(&self) -> Option<TcpStream> {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                if let Err(err) = stream.set_nonblocking(true) {
                    warn!(error = %err, "Failed to set client non-blocking");
                    return None;
                }
                if let Err(err) = stream.set_nodelay(true) {
                    debug!(error = %err, "Failed to disable Nagle on client socket");
                }
                info!(client_addr = %addr, "Serial client connected");
                BRIDGE_CONNECTED.set(1.0);
                Some(stream)
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => None,
            Err(err) => {
                warn!(error = %err, "Serial bridge accept error");
                None
            }
        }
    }
}
