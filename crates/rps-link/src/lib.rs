use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Handshake probe byte; the device answers with [`PROBE_ACK`]
pub const PROBE: u8 = b'Q';
pub const PROBE_ACK: u8 = b'R';

pub const DEFAULT_BAUDRATE: u32 = 9600;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Opening the port may reset the board, so the first probe can be lost
const HANDSHAKE_ATTEMPTS: u32 = 3;
const HANDSHAKE_SETTLE: Duration = Duration::from_millis(500);

const WRITE_RETRY: RetryPolicy = RetryPolicy {
    attempts: 20,
    delay: Duration::from_millis(100),
};

/// Injected sleep so retry behavior is testable without real delays
pub trait Sleeper: Send {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or the attempt budget is spent,
    /// sleeping between attempts but not after the last one. Returns the
    /// final error on exhaustion.
    pub fn run<T, E>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: impl FnMut() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let attempts = self.attempts.max(1);
        for _ in 1..attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(_) => sleeper.sleep(self.delay),
            }
        }
        op()
    }
}

/// An open serial connection
pub trait SerialPort: Send {
    fn name(&self) -> &str;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Reads bytes until a newline or the port timeout, returning whatever
    /// arrived (possibly nothing).
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Blocks for the next available byte
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// Enumerates and opens serial ports. Swapped for a scripted fake in tests.
pub trait Transport: Send {
    fn list_ports(&self) -> Vec<String>;

    fn open(&self, port: &str, baudrate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>>;
}

/// Transport backed by the host's real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTransport;

impl Transport for SystemTransport {
    fn list_ports(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                warn!("Failed to enumerate serial ports: {}", e);
                Vec::new()
            }
        }
    }

    fn open(&self, port: &str, baudrate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
        let inner = serialport::new(port, baudrate)
            .timeout(timeout)
            .open()
            .with_context(|| format!("Failed to open {}", port))?;
        Ok(Box::new(SystemPort {
            name: port.to_string(),
            inner,
        }))
    }
}

struct SystemPort {
    name: String,
    inner: Box<dyn serialport::SerialPort>,
}

impl SerialPort for SystemPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.inner.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                // Timeout ends the line, like a readline with a deadline
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        Ok(line)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// Connection to the physical actuator.
///
/// The link is best-effort by design: discovery failure leaves it closed,
/// write failures are retried within a bounded policy and then escalated
/// to exactly one rediscovery, and no transport error ever reaches a
/// caller. A missing device degrades dispatch to a logged no-op while the
/// rest of the system keeps running.
pub struct SerialLink {
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    baudrate: u32,
    timeout: Duration,
    candidates: Vec<String>,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Link over the host's real serial ports. An empty candidate list
    /// means every enumerated port is tried.
    pub fn new(candidates: Vec<String>, baudrate: u32, timeout: Duration) -> Self {
        Self::with_transport(
            Box::new(SystemTransport),
            Box::new(SystemSleeper),
            candidates,
            baudrate,
            timeout,
        )
    }

    pub fn with_transport(
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
        candidates: Vec<String>,
        baudrate: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            sleeper,
            baudrate,
            timeout,
            candidates,
            port: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port.as_deref().map(SerialPort::name)
    }

    fn candidate_ports(&self) -> Vec<String> {
        if self.candidates.is_empty() {
            self.transport.list_ports()
        } else {
            self.candidates.clone()
        }
    }

    /// Tries each candidate port in order and keeps the first one that
    /// answers the handshake. Total failure is not fatal: the link stays
    /// closed and dispatch becomes a no-op until a device appears.
    pub fn discover_and_open(&mut self) -> bool {
        self.port = None;
        for name in self.candidate_ports() {
            let mut port = match self.transport.open(&name, self.baudrate, self.timeout) {
                Ok(port) => port,
                Err(e) => {
                    debug!("Skipping {}: {}", name, e);
                    continue;
                }
            };
            if self.handshake(port.as_mut()) {
                info!("Actuator connected on {}", name);
                self.port = Some(port);
                return true;
            }
        }
        warn!("No actuator answered the handshake; dispatch disabled until one appears");
        false
    }

    fn handshake(&self, port: &mut dyn SerialPort) -> bool {
        for _ in 0..HANDSHAKE_ATTEMPTS {
            if let Err(e) = port.write_all(&[PROBE]) {
                debug!("Probe write failed on {}: {}", port.name(), e);
                continue;
            }
            self.sleeper.sleep(HANDSHAKE_SETTLE);
            match port.read_line() {
                Ok(response) if response == [PROBE_ACK] => {
                    debug!("Handshake ok on {}", port.name());
                    return true;
                }
                Ok(response) => {
                    debug!("Unexpected handshake response on {}: {:?}", port.name(), response)
                }
                Err(e) => debug!("Handshake read failed on {}: {}", port.name(), e),
            }
        }
        false
    }

    fn ensure_open(&mut self) -> bool {
        if self.port.is_none() {
            self.discover_and_open();
        }
        self.port.is_some()
    }

    /// Sends a single command byte; see [`SerialLink::write`]
    pub fn write_byte(&mut self, command: u8) {
        self.write(&[command]);
    }

    /// Best-effort write. The message is attempted up to 20 times with a
    /// fixed delay; if every attempt fails, the link runs one full
    /// rediscovery and retries the write exactly once more. Errors are
    /// logged, never propagated.
    pub fn write(&mut self, message: &[u8]) {
        if !self.ensure_open() {
            debug!("Dropping write of {:?}: no actuator", message);
            return;
        }

        let Some(port) = self.port.as_mut() else {
            return;
        };
        let outcome = WRITE_RETRY.run(self.sleeper.as_ref(), || port.write_all(message));

        match outcome {
            Ok(()) => debug!("Wrote {:?} to {}", message, self.port_name().unwrap_or("?")),
            Err(e) => {
                warn!(
                    "Write failed after {} attempts ({}); rediscovering actuator",
                    WRITE_RETRY.attempts, e
                );
                if self.discover_and_open() {
                    if let Some(port) = self.port.as_mut() {
                        if let Err(e) = port.write_all(message) {
                            warn!("Retried write failed after rediscovery: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// Blocking read up to the next newline, lazily opening the link
    pub fn read_line(&mut self) -> Option<Vec<u8>> {
        if !self.ensure_open() {
            return None;
        }
        let port = self.port.as_mut()?;
        match port.read_line() {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Serial read failed: {}", e);
                None
            }
        }
    }

    /// Blocking read of the next byte, lazily opening the link
    pub fn read_byte(&mut self) -> Option<u8> {
        if !self.ensure_open() {
            return None;
        }
        let port = self.port.as_mut()?;
        match port.read_byte() {
            Ok(byte) => Some(byte),
            Err(e) => {
                warn!("Serial read failed: {}", e);
                None
            }
        }
    }
}
