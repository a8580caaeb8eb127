use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::Result;
use log::{debug, info, warn};
use rosc::{OscMessage, OscPacket, OscType, encoder};

use crate::{
    systems::FrameResult, tracker_config::OscSettings, tracking::MappedPoint,
};

/// Anything that can deliver a mapped head position downstream
pub trait HeadSender {
    fn send_head(&self, head: &MappedPoint);
}

/// Sends head positions as OSC messages over UDP, one datagram per destination.
/// Delivery is fire-and-forget: a failed send is logged and otherwise ignored.
pub struct OscEmitter {
    socket: UdpSocket,
    address: String,
    /// Takes precedence over the address in any settings applied later
    address_override: Option<String>,
    destinations: Vec<SocketAddr>,
}

impl OscEmitter {
    pub fn new(settings: &OscSettings, address_override: Option<String>) -> Result<OscEmitter> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let mut emitter = OscEmitter {
            socket,
            address: String::new(),
            address_override,
            destinations: Vec::new(),
        };
        emitter.configure(settings);
        Ok(emitter)
    }

    /// Point the emitter at a (possibly) new address and set of destinations.
    /// Destinations which cannot be resolved are skipped.
    pub fn configure(&mut self, settings: &OscSettings) {
        self.address = self
            .address_override
            .clone()
            .unwrap_or_else(|| settings.address.clone());
        self.destinations = settings
            .destinations
            .iter()
            .filter_map(|d| match (d.host.as_str(), d.port).to_socket_addrs() {
                Ok(mut addrs) => addrs.next(),
                Err(e) => {
                    warn!("Could not resolve OSC destination {}:{}: {}", d.host, d.port, e);
                    None
                }
            })
            .collect();
        info!(
            "OSC messages to \"{}\" will be sent to {:?}",
            self.address, self.destinations
        );
    }

    pub fn destinations(&self) -> &[SocketAddr] {
        &self.destinations
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn send(&self, head: &MappedPoint) {
        let data = match build_head_packet(&self.address, head) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode OSC message: {}", e);
                return;
            }
        };
        for destination in &self.destinations {
            if let Err(e) = self.socket.send_to(&data, destination) {
                warn!("Failed to send OSC message to {}: {}", destination, e);
            }
        }
        debug!("Sent {} {:?}", self.address, head);
    }
}

impl HeadSender for OscEmitter {
    fn send_head(&self, head: &MappedPoint) {
        self.send(head);
    }
}

/// Send the head for this frame, if a person was found. Returns whether
/// anything was sent.
pub fn send_tracked_head(result: &FrameResult, sender: &impl HeadSender) -> bool {
    match &result.tracked {
        Some(tracked) => {
            sender.send_head(&tracked.mapped_head);
            true
        }
        None => false,
    }
}

/// Encode a single OSC message: the address followed by x, y, z as floats
pub fn build_head_packet(address: &str, head: &MappedPoint) -> Result<Vec<u8>> {
    let msg = OscMessage {
        addr: address.to_string(),
        args: vec![
            OscType::Float(head.x),
            OscType::Float(head.y),
            OscType::Float(head.z),
        ],
    };
    let data = encoder::encode(&OscPacket::Message(msg))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use ndarray::Array2;
    use rosc::decoder;

    use super::*;
    use crate::{
        depth_image::DepthFrame,
        systems::Systems,
        tracker_config::{OscDestination, TrackerConfig},
    };

    /// Keeps everything it is asked to send
    #[derive(Default)]
    struct RecordingSender(RefCell<Vec<MappedPoint>>);

    impl HeadSender for RecordingSender {
        fn send_head(&self, head: &MappedPoint) {
            self.0.borrow_mut().push(*head);
        }
    }

    fn local_receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn settings_for(address: &str, receivers: &[&UdpSocket]) -> OscSettings {
        OscSettings {
            address: String::from(address),
            destinations: receivers
                .iter()
                .map(|r| OscDestination {
                    host: String::from("127.0.0.1"),
                    port: r.local_addr().unwrap().port(),
                })
                .collect(),
        }
    }

    fn decode(data: &[u8]) -> OscMessage {
        match decoder::decode_udp(data).unwrap().1 {
            OscPacket::Message(msg) => msg,
            OscPacket::Bundle(_) => panic!("expected a single message, not a bundle"),
        }
    }

    #[test]
    fn test_head_packet_layout() {
        let data = build_head_packet("/head", &MappedPoint::new(1.5, -2., 1750.)).unwrap();
        let msg = decode(&data);
        assert_eq!(msg.addr, "/head");
        assert_eq!(
            msg.args,
            vec![
                OscType::Float(1.5),
                OscType::Float(-2.),
                OscType::Float(1750.)
            ]
        );
    }

    #[test]
    fn test_unresolvable_destination_is_skipped() {
        let settings = OscSettings {
            address: String::from("/head"),
            destinations: vec![
                OscDestination {
                    host: String::from("127.0.0.1"),
                    port: 9000,
                },
                OscDestination {
                    host: String::from("not a host name"),
                    port: 9000,
                },
            ],
        };
        let emitter = OscEmitter::new(&settings, None).unwrap();
        assert_eq!(emitter.destinations().len(), 1);
    }

    #[test]
    fn test_every_destination_receives_the_message() {
        let receivers = [local_receiver(), local_receiver()];
        let settings = settings_for("/tracker/head", &[&receivers[0], &receivers[1]]);
        let emitter = OscEmitter::new(&settings, None).unwrap();
        emitter.send(&MappedPoint::new(10., 20., 30.));

        for receiver in receivers {
            let mut buf = [0u8; 1024];
            let (size, _) = receiver.recv_from(&mut buf).unwrap();
            let msg = decode(&buf[..size]);
            assert_eq!(msg.addr, "/tracker/head");
            assert_eq!(msg.args[2], OscType::Float(30.));
        }
    }

    #[test]
    fn test_address_override_survives_reconfigure() {
        let receiver = local_receiver();
        let mut emitter =
            OscEmitter::new(&settings_for("/head", &[&receiver]), Some(String::from("/me")))
                .unwrap();
        assert_eq!(emitter.address(), "/me");

        // e.g. settings loaded from file, or reset to defaults
        emitter.configure(&settings_for("/from/file", &[&receiver]));
        assert_eq!(emitter.address(), "/me");

        emitter.send(&MappedPoint::new(1., 2., 3.));
        let mut buf = [0u8; 1024];
        let (size, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(decode(&buf[..size]).addr, "/me");

        let mut plain = OscEmitter::new(&settings_for("/head", &[&receiver]), None).unwrap();
        plain.configure(&settings_for("/from/file", &[&receiver]));
        assert_eq!(plain.address(), "/from/file");
    }

    #[test]
    fn test_sends_only_when_someone_is_tracked() {
        let mut config = TrackerConfig::default();
        config.tracking.threshold = 100;
        let frame = |with_person: bool| {
            DepthFrame::new(Array2::from_shape_fn((480, 640), |(y, x)| {
                if with_person && (280..360).contains(&x) && (120..440).contains(&y) {
                    1500
                } else {
                    3000
                }
            }))
        };
        let mut systems = Systems::new();
        let sender = RecordingSender::default();

        let empty = systems.process_frame(&frame(false), &config);
        assert!(!send_tracked_head(&empty, &sender));
        assert!(sender.0.borrow().is_empty());

        let found = systems.process_frame(&frame(true), &config);
        assert!(send_tracked_head(&found, &sender));
        assert_eq!(
            *sender.0.borrow(),
            vec![found.tracked.as_ref().unwrap().mapped_head]
        );

        let empty_again = systems.process_frame(&frame(false), &config);
        assert!(!send_tracked_head(&empty_again, &sender));
        assert_eq!(sender.0.borrow().len(), 1);
    }
}
