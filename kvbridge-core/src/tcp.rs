//! A blocking single-connection transport over `std::net`.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::batch::BufferedCommand;
use crate::command::CommandKind;
use crate::config::{ClientConfig, NodeAddress};
use crate::resp3::{encode_parts, encode_request, parse_reply};
use crate::response::ResponseValue;
use crate::route::Route;
use crate::transport::Transport;
use crate::transport_error;

const READ_CHUNK: usize = 16 * 1024;

pub struct TcpTransport {
    stream: TcpStream,
    address: NodeAddress,
    /// Bytes read past the end of the last reply.
    buffer: Vec<u8>,
    protocol: u8,
    /// Set once a request failed mid-exchange. Replies may still be in
    /// flight, so the stream is shut down and never read again.
    broken: bool,
}

impl TcpTransport {
    /// Connects to the first reachable address of `config`, then performs
    /// the handshake: `HELLO 3`, `SELECT` for a non-zero database and
    /// `CLIENT SETNAME` when a name is configured.
    ///
    /// A server that refuses `HELLO` is spoken to in RESP2.
    pub fn connect(config: &ClientConfig) -> crate::Result<TcpTransport> {
        let mut last_error = None;

        for address in &config.addresses {
            match open(address, config) {
                Ok(stream) => {
                    log::debug!("connected to {address}");
                    let mut transport = TcpTransport::from_stream(stream, address.clone());
                    transport.handshake(config)?;
                    return Ok(transport);
                }
                Err(e) => {
                    log::warn!("connect to {address} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => transport_error!(format!("no reachable address: {e}")),
            None => transport_error!("no address configured"),
        }
    }

    /// Wraps an established stream without any handshake.
    pub fn from_stream(stream: TcpStream, address: NodeAddress) -> TcpTransport {
        TcpTransport {
            stream,
            address,
            buffer: Vec::with_capacity(READ_CHUNK),
            protocol: 2,
            broken: false,
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// 3 after a successful `HELLO 3`, otherwise 2.
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// True after a timeout or I/O failure left the reply stream out of step.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Replaces the connection with a fresh one, handshake included.
    pub fn reconnect(&mut self, config: &ClientConfig) -> crate::Result<()> {
        *self = TcpTransport::connect(config)?;
        Ok(())
    }

    fn handshake(&mut self, config: &ClientConfig) -> crate::Result<()> {
        match self.call(&[b"HELLO", b"3"])? {
            ResponseValue::Error(message) => {
                log::debug!(
                    "HELLO 3 refused ({}), staying on RESP2",
                    String::from_utf8_lossy(&message)
                );
            }
            _ => self.protocol = 3,
        }

        if config.database_id != 0 {
            let db = config.database_id.to_string();
            self.call_checked(&[b"SELECT", db.as_bytes()])?;
        }
        if let Some(name) = &config.client_name {
            self.call_checked(&[b"CLIENT", b"SETNAME", name.as_bytes()])?;
        }
        Ok(())
    }

    fn call(&mut self, parts: &[&[u8]]) -> crate::Result<ResponseValue> {
        self.write_request(&encode_parts(parts))?;
        self.read_reply()
    }

    fn ensure_usable(&self) -> crate::Result<()> {
        if self.broken {
            return transport_error!(format!(
                "connection to {} is broken, reconnect first",
                self.address
            ));
        }
        Ok(())
    }

    /// Drops the connection after a failed exchange.
    fn poison<T>(&mut self, error: crate::Error) -> crate::Result<T> {
        log::warn!("closing connection to {}: {error}", self.address);
        self.broken = true;
        self.buffer.clear();
        let _ = self.stream.shutdown(Shutdown::Both);
        Err(error)
    }

    fn write_request(&mut self, request: &[u8]) -> crate::Result<()> {
        self.ensure_usable()?;
        match self.stream.write_all(request) {
            Ok(()) => Ok(()),
            Err(e) => self.poison(e.into()),
        }
    }

    fn call_checked(&mut self, parts: &[&[u8]]) -> crate::Result<ResponseValue> {
        match self.call(parts)? {
            ResponseValue::Error(message) => server_error(&message),
            reply => Ok(reply),
        }
    }

    /// Reads exactly one reply frame, keeping any bytes that follow it.
    /// Any failure other than a server error reply breaks the connection.
    fn read_reply(&mut self) -> crate::Result<ResponseValue> {
        self.ensure_usable()?;
        match self.read_frame() {
            Ok(value) => Ok(value),
            Err(e) => self.poison(e),
        }
    }

    fn read_frame(&mut self) -> crate::Result<ResponseValue> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if !self.buffer.is_empty() {
                match parse_reply(&self.buffer) {
                    Ok((value, consumed)) => {
                        self.buffer.drain(..consumed);
                        return Ok(value);
                    }
                    Err(e) if e.is_incomplete() => {}
                    Err(e) => return transport_error!(format!("malformed reply: {e}")),
                }
            }

            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return transport_error!("connection closed by peer");
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn accepts(&self, route: &Route) -> bool {
        match route {
            Route::ByKey(_) | Route::Simple(_) => true,
            Route::ByAddress { host, port } => {
                *port == self.address.port
                    && (host.eq_ignore_ascii_case(&self.address.host)
                        || self
                            .stream
                            .peer_addr()
                            .map(|peer| peer.ip().to_string() == *host)
                            .unwrap_or(false))
            }
        }
    }
}

fn open(address: &NodeAddress, config: &ClientConfig) -> std::io::Result<TcpStream> {
    let timeout = config.timeout();
    let mut last_error = None;

    for addr in (address.host.as_str(), address.port).to_socket_addrs()? {
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(&addr, t),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no address")
    }))
}

fn server_error<T>(message: &[u8]) -> crate::Result<T> {
    transport_error!(String::from_utf8_lossy(message))
}

impl Transport for TcpTransport {
    fn send(&mut self, kind: CommandKind, args: &[&[u8]]) -> crate::Result<ResponseValue> {
        self.write_request(&encode_request(kind, args))?;
        match self.read_reply()? {
            ResponseValue::Error(message) => server_error(&message),
            reply => Ok(reply),
        }
    }

    fn send_routed(
        &mut self,
        kind: CommandKind,
        args: &[&[u8]],
        route: &Route,
    ) -> crate::Result<ResponseValue> {
        if !self.accepts(route) {
            return transport_error!(format!(
                "route {route} does not match the connected node {}",
                self.address
            ));
        }
        self.send(kind, args)
    }

    /// Atomic batches are wrapped in MULTI/EXEC. Everything is written
    /// before the first reply is read.
    fn send_batch(
        &mut self,
        commands: &[BufferedCommand],
        is_atomic: bool,
    ) -> crate::Result<Vec<ResponseValue>> {
        let mut request = Vec::new();
        if is_atomic {
            request.extend(encode_parts(&[b"MULTI"]));
        }
        for command in commands {
            request.extend(encode_request(command.kind, &command.arg_slices()));
        }
        if is_atomic {
            request.extend(encode_parts(&[b"EXEC"]));
        }
        self.write_request(&request)?;

        if !is_atomic {
            return (0..commands.len()).map(|_| self.read_reply()).collect();
        }

        let multi = self.read_reply()?;
        let mut queue_error = None;
        for _ in commands {
            // QUEUED, or an error for a command the server refused
            if let ResponseValue::Error(message) = self.read_reply()? {
                queue_error.get_or_insert(message);
            }
        }
        let exec = self.read_reply()?;

        if let ResponseValue::Error(message) = multi {
            return server_error(&message);
        }
        match exec {
            ResponseValue::Array(replies) => Ok(replies),
            ResponseValue::Null => transport_error!("transaction aborted"),
            ResponseValue::Error(message) => {
                server_error(queue_error.as_deref().unwrap_or(&message))
            }
            other => transport_error!(format!("unexpected EXEC reply: {}", other.type_name())),
        }
    }
}
