// src/backends/samp.rs
use std::io::{Cursor, Read};
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use tokio::net::UdpSocket;

use super::{Backend, BackendKind, QueryError};
use crate::models::server::{SampInfo, ServerStatus};
use crate::utils::resolve_ipv4;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3_000);

const MAGIC: &[u8; 4] = b"SAMP";
const INFO_OPCODE: u8 = b'i';
const HEADER_LEN: usize = 11;

/// Queries SA-MP servers directly over UDP.
#[derive(Debug, Default)]
pub struct SampBackend;

impl SampBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Builds an information request: magic, server IPv4, port and opcode.
pub fn build_info_request(server: SocketAddrV4) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_LEN);
    packet.extend_from_slice(MAGIC);
    packet.extend_from_slice(&server.ip().octets());
    packet.extend_from_slice(&server.port().to_le_bytes());
    packet.push(INFO_OPCODE);
    packet
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> std::io::Result<String> {
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("string of {} bytes exceeds the {} remaining", len, remaining),
        ));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn decode_info(cursor: &mut Cursor<&[u8]>) -> std::io::Result<SampInfo> {
    let passworded = cursor.read_u8()? != 0;
    let players = cursor.read_u16::<LittleEndian>()?;
    let max_players = cursor.read_u16::<LittleEndian>()?;
    Ok(SampInfo {
        passworded,
        players,
        max_players,
        host_name: read_string(cursor)?,
        game_mode: read_string(cursor)?,
        language: read_string(cursor)?,
    })
}

/// Decodes an information reply. Returns `None` for datagrams that are not
/// an information reply at all, `Some(Err)` for truncated ones.
pub fn parse_info_response(buffer: &[u8]) -> Option<Result<SampInfo, String>> {
    if buffer.len() < HEADER_LEN || &buffer[..4] != MAGIC || buffer[10] != INFO_OPCODE {
        return None;
    }

    let parsed = decode_info(&mut Cursor::new(&buffer[HEADER_LEN..]));
    Some(parsed.map_err(|e| format!("Malformed information reply: {}", e)))
}

async fn exchange(server: SocketAddrV4) -> Result<SampInfo, String> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| format!("Could not bind udp socket: {}", e))?;

    socket
        .send_to(&build_info_request(server), SocketAddr::V4(server))
        .await
        .map_err(|e| format!("Error sending query to {}: {}", server, e))?;

    let mut buffer = [0u8; 2048];
    loop {
        let (len, from) = socket
            .recv_from(&mut buffer)
            .await
            .map_err(|e| format!("Failed to receive reply from {}: {}", server, e))?;

        if from != SocketAddr::V4(server) {
            debug!(
                "[{}] Ignoring datagram from {} while querying {}",
                BackendKind::Samp.tag(),
                from,
                server
            );
            continue;
        }

        match parse_info_response(&buffer[..len]) {
            Some(result) => return result,
            None => debug!(
                "[{}] Ignoring non-information reply from {} with len {}",
                BackendKind::Samp.tag(),
                server,
                len
            ),
        }
    }
}

#[async_trait]
impl Backend for SampBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Samp
    }

    async fn query(
        &self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ServerStatus, QueryError> {
        let lookup = async {
            let server = resolve_ipv4(address, port).await?;
            debug!("[{}] Resolved {} to {}", self.tag(), address, server);
            exchange(server).await
        };

        let info = match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => return Err(QueryError::Network(e)),
            Err(_) => {
                return Err(QueryError::Network(format!(
                    "Timed out after {} ms querying {}:{}",
                    timeout.as_millis(),
                    address,
                    port
                )))
            }
        };

        debug!(
            "[{}] {}:{} is \"{}\" ({}, {}{})",
            self.tag(),
            address,
            port,
            info.host_name,
            info.game_mode,
            info.language,
            if info.passworded { ", passworded" } else { "" }
        );
        Ok(ServerStatus::from(&info))
    }
}
