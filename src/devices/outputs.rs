//! Output sinks: where assembled frames end up.
//!
//! A sink receives frames already scaled by the device's brightness and
//! clipped to `0..=255`. It transmits or records them and never mutates them.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::{OptionSpec, Params};
use crate::effects::shared::lock;
use crate::effects::Pixel;

/// Errors raised by a sink. Local to the device that owns it.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame has {actual} pixels, output expects {expected}")]
    FrameSize { expected: usize, actual: usize },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// A frame sink.
pub trait Output: Send {
    /// Number of pixels the sink drives.
    fn pixel_count(&self) -> usize;

    /// Transmit one frame of `pixel_count` RGB triples.
    fn flush(&mut self, frame: &[Pixel]) -> Result<(), OutputError>;
}

fn check_frame_size(expected: usize, frame: &[Pixel]) -> Result<(), OutputError> {
    if frame.len() != expected {
        return Err(OutputError::FrameSize {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Output configuration
// ============================================================================

/// Options of a UDP output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    /// Hostname or IP address of the controller.
    pub ip_address: String,
    pub port: u16,
    pub pixel_count: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            ip_address: String::new(),
            port: 21324,
            pixel_count: 0,
        }
    }
}

impl Params for UdpConfig {
    const SCHEMA: &'static [OptionSpec] = &[
        OptionSpec::text("ip_address", "Hostname or IP address of the device").required(),
        OptionSpec::int("port", "Port for the UDP device", 1, 65535),
        OptionSpec::int("pixel_count", "Number of individual pixels", 1, 10_000).required(),
    ];
}

/// Options of outputs that only need a size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub pixel_count: usize,
}

impl Params for StripConfig {
    const SCHEMA: &'static [OptionSpec] =
        &[OptionSpec::int("pixel_count", "Number of individual pixels", 1, 10_000).required()];
}

// ============================================================================
// Sinks
// ============================================================================

/// Sends each frame as one datagram of `pixel_count * 3` RGB bytes.
pub struct UdpOutput {
    socket: UdpSocket,
    target: SocketAddr,
    pixel_count: usize,
    buffer: Vec<[u8; 3]>,
}

impl UdpOutput {
    pub fn new(ip_address: &str, port: u16, pixel_count: usize) -> Result<Self, OutputError> {
        let target = (ip_address, port)
            .to_socket_addrs()
            .map_err(|e| OutputError::InvalidAddress(format!("{}:{} ({})", ip_address, port, e)))?
            .next()
            .ok_or_else(|| OutputError::InvalidAddress(format!("{}:{}", ip_address, port)))?;

        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        log::info!("UDP output to {} ({} pixels)", target, pixel_count);

        Ok(Self {
            socket,
            target,
            pixel_count,
            buffer: vec![[0; 3]; pixel_count],
        })
    }

    pub fn from_config(config: &UdpConfig) -> Result<Self, OutputError> {
        Self::new(&config.ip_address, config.port, config.pixel_count)
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Output for UdpOutput {
    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn flush(&mut self, frame: &[Pixel]) -> Result<(), OutputError> {
        check_frame_size(self.pixel_count, frame)?;
        for (bytes, pixel) in self.buffer.iter_mut().zip(frame) {
            *bytes = pixel.map(|c| c.round().clamp(0.0, 255.0) as u8);
        }
        self.socket
            .send_to(bytemuck::cast_slice(&self.buffer), self.target)?;
        Ok(())
    }
}

/// Records frames in memory for previews and tests.
///
/// Clones share the same recording, so a clone kept by the caller observes
/// what the device flushed.
#[derive(Debug, Clone)]
pub struct MemoryOutput {
    pixel_count: usize,
    frames: Arc<Mutex<Vec<Vec<Pixel>>>>,
}

impl MemoryOutput {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            pixel_count,
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every frame flushed so far, oldest first.
    pub fn frames(&self) -> Vec<Vec<Pixel>> {
        lock(&self.frames).clone()
    }

    pub fn last_frame(&self) -> Option<Vec<Pixel>> {
        lock(&self.frames).last().cloned()
    }

    pub fn flush_count(&self) -> usize {
        lock(&self.frames).len()
    }
}

impl Output for MemoryOutput {
    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn flush(&mut self, frame: &[Pixel]) -> Result<(), OutputError> {
        check_frame_size(self.pixel_count, frame)?;
        lock(&self.frames).push(frame.to_vec());
        Ok(())
    }
}

/// Discards every frame.
#[derive(Debug, Clone, Copy)]
pub struct NullOutput {
    pixel_count: usize,
}

impl NullOutput {
    pub fn new(pixel_count: usize) -> Self {
        Self { pixel_count }
    }
}

impl Output for NullOutput {
    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn flush(&mut self, frame: &[Pixel]) -> Result<(), OutputError> {
        check_frame_size(self.pixel_count, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_memory_output_records_frames() {
        let output = MemoryOutput::new(2);
        let mut sink: Box<dyn Output> = Box::new(output.clone());
        sink.flush(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        sink.flush(&[[0.0; 3]; 2]).unwrap();

        assert_eq!(output.flush_count(), 2);
        assert_eq!(output.frames()[0][1], [4.0, 5.0, 6.0]);
        assert_eq!(output.last_frame(), Some(vec![[0.0; 3]; 2]));
    }

    #[test]
    fn test_frame_size_mismatch() {
        let mut output = NullOutput::new(3);
        let err = output.flush(&[[0.0; 3]; 2]).unwrap_err();
        assert!(matches!(err, OutputError::FrameSize { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_udp_output_sends_rgb_bytes() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut output = UdpOutput::new("127.0.0.1", port, 3).unwrap();
        output
            .flush(&[[255.0, 0.0, 10.4], [100.0, 99.6, 0.0], [1.0, 2.0, 3.0]])
            .unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[255, 0, 10, 100, 100, 0, 1, 2, 3]);
    }

    #[test]
    fn test_udp_config_requires_address() {
        use serde_json::json;
        assert!(UdpConfig::from_config(&json!({"pixel_count": 10})).is_err());
        let config = UdpConfig::from_config(&json!({"ip_address": "10.0.0.2", "pixel_count": 10})).unwrap();
        assert_eq!(config.port, 21324);
    }
}
