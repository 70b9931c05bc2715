//! The `Full` datagram: layer 2 through payload processed as one unit.
//!
//! `Full` aggregates a link header, a network header, an optional
//! transport header, the payload, and a link footer. The headers are
//! tagged variants; the discriminators never reach the wire.
//! [calc_from_payload](Full::calc_from_payload) walks the stack
//! bottom-up, asking each header for its derived fields through the
//! [DerivedFields] hooks, so that every layer sees the finished wire
//! image of the layer below it.

use core::fmt;

use log::{debug, trace};

use crate::bitfield::{BitFieldGroup, Field, GroupKind};
use crate::wire::ip::{Port, Pseudo};
use crate::wire::{ethernet, icmp, ipv4, tcp, udp};
use crate::wire::{DerivedFields, Error, Result};

/// The link-layer header variants.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LinkHeader {
    Ethernet(ethernet::Header),
}

impl LinkHeader {
    fn from_tag(tag: &str) -> Result<LinkHeader> {
        match tag {
            "eth" | "ethernet" => Ok(LinkHeader::Ethernet(ethernet::Header::default())),
            _ => Err(Error::InvalidHeader),
        }
    }

    /// The active arm as a bit-field record.
    pub fn as_group(&self) -> &dyn BitFieldGroup {
        match self {
            LinkHeader::Ethernet(header) => header,
        }
    }
}

/// The network-layer header variants. ICMP sits at this level: its
/// packet header takes the place of a network header when a datagram
/// carries a bare control message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NetHeader {
    Ipv4(ipv4::Header),
    Icmp(icmp::Packet),
}

impl NetHeader {
    fn from_tag(tag: &str) -> Result<NetHeader> {
        match tag {
            "ip" | "ipv4" => Ok(NetHeader::Ipv4(ipv4::Header::default())),
            "icmp" => Ok(NetHeader::Icmp(icmp::Packet::default())),
            _ => Err(Error::InvalidHeader),
        }
    }

    pub fn as_group(&self) -> &dyn BitFieldGroup {
        match self {
            NetHeader::Ipv4(header) => header,
            NetHeader::Icmp(packet) => packet,
        }
    }

    fn derived_mut(&mut self) -> &mut dyn DerivedFields {
        match self {
            NetHeader::Ipv4(header) => header,
            NetHeader::Icmp(packet) => packet,
        }
    }

    /// The pseudo-header this network layer contributes to transport
    /// checksums, if it contributes one.
    fn pseudo(&self) -> Option<Pseudo> {
        match self {
            NetHeader::Ipv4(header) => Some(Pseudo {
                src_addr: header.src_addr,
                dst_addr: header.dst_addr,
                protocol: header.protocol.into(),
            }),
            NetHeader::Icmp(_) => None,
        }
    }
}

/// The transport-layer header variants.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransportHeader {
    Udp(udp::Header),
    Tcp(tcp::Header),
}

impl TransportHeader {
    fn from_tag(tag: &str) -> Result<TransportHeader> {
        match tag {
            "udp" => Ok(TransportHeader::Udp(udp::Header::default())),
            "tcp" => Ok(TransportHeader::Tcp(tcp::Header::default())),
            _ => Err(Error::InvalidHeader),
        }
    }

    pub fn as_group(&self) -> &dyn BitFieldGroup {
        match self {
            TransportHeader::Udp(header) => header,
            TransportHeader::Tcp(header) => header,
        }
    }

    fn derived_mut(&mut self) -> &mut dyn DerivedFields {
        match self {
            TransportHeader::Udp(header) => header,
            TransportHeader::Tcp(header) => header,
        }
    }

    /// The IPv4 protocol number this transport rides under.
    fn protocol(&self) -> ipv4::Protocol {
        match self {
            TransportHeader::Udp(_) => ipv4::Protocol::Udp,
            TransportHeader::Tcp(_) => ipv4::Protocol::Tcp,
        }
    }
}

/// The link-layer footer variants.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LinkFooter {
    Ethernet(ethernet::Footer),
}

impl LinkFooter {
    fn from_tag(tag: &str) -> Result<LinkFooter> {
        match tag {
            "eth" | "ethernet" => Ok(LinkFooter::Ethernet(ethernet::Footer::default())),
            _ => Err(Error::InvalidFooter),
        }
    }

    pub fn as_group(&self) -> &dyn BitFieldGroup {
        match self {
            LinkFooter::Ethernet(footer) => footer,
        }
    }

    fn derived_mut(&mut self) -> &mut dyn DerivedFields {
        match self {
            LinkFooter::Ethernet(footer) => footer,
        }
    }
}

/// A whole datagram. Link framing is optional so a value can be built
/// from layer 3 up; [init](Full::init) always populates it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Full {
    pub link: Option<LinkHeader>,
    pub net: NetHeader,
    pub transport: Option<TransportHeader>,
    pub payload: Vec<u8>,
    pub footer: Option<LinkFooter>,
}

impl Full {
    /// Build a datagram from variant tags.
    ///
    /// `layer` (2, 3, or 4) names the outermost layer the caller
    /// supplies; `header_tags[0]` is that layer's variant and later
    /// tags descend the stack. Layers above `layer` are defaulted: an
    /// Ethernet header with all-zero addresses, an IPv4 header with the
    /// protocol taken from the transport tag. `footer_tag` names the
    /// footer variant.
    pub fn init(
        layer: u8,
        header_tags: &[&str],
        payload: Vec<u8>,
        footer_tag: &str,
    ) -> Result<Full> {
        let mut tags = header_tags.iter().copied();
        let mut next_tag = || tags.next().ok_or(Error::InvalidHeader);

        let (link, mut net) = match layer {
            2 => {
                let link = LinkHeader::from_tag(next_tag()?)?;
                let net = NetHeader::from_tag(next_tag()?)?;
                (link, net)
            }
            3 => {
                let net = NetHeader::from_tag(next_tag()?)?;
                (LinkHeader::Ethernet(ethernet::Header::default()), net)
            }
            4 => (
                LinkHeader::Ethernet(ethernet::Header::default()),
                NetHeader::Ipv4(ipv4::Header::default()),
            ),
            _ => return Err(Error::InvalidHeader),
        };

        let transport = match tags.next() {
            Some(tag) => Some(TransportHeader::from_tag(tag)?),
            None => None,
        };
        if let (NetHeader::Ipv4(header), Some(transport)) = (&mut net, &transport) {
            header.protocol = transport.protocol();
        }

        let footer = LinkFooter::from_tag(footer_tag)?;

        Ok(Full {
            link: Some(link),
            net,
            transport,
            payload,
            footer: Some(footer),
        })
    }

    /// Point the IPv4 addresses and transport ports of the datagram,
    /// wherever those layers are present.
    pub fn set_endpoints(&mut self, src_addr: ipv4::Address, dst_addr: ipv4::Address, src_port: Port, dst_port: Port) {
        if let NetHeader::Ipv4(header) = &mut self.net {
            header.src_addr = src_addr;
            header.dst_addr = dst_addr;
        }
        match &mut self.transport {
            Some(TransportHeader::Udp(header)) => {
                header.src_port = src_port;
                header.dst_port = dst_port;
            }
            Some(TransportHeader::Tcp(header)) => {
                header.src_port = src_port;
                header.dst_port = dst_port;
            }
            None => {}
        }
    }

    fn header_bits(&self) -> usize {
        self.link.as_ref().map_or(0, |l| l.as_group().bit_width())
            + self.net.as_group().bit_width()
            + self.transport.as_ref().map_or(0, |t| t.as_group().bit_width())
    }

    /// Fill in every derived field, bottom-up.
    ///
    /// The payload is first zero-padded until the emitted image is a
    /// whole number of 32-bit words (the 32-bit footer cannot change
    /// that residue). The transport header then computes its length and
    /// checksum over the padded payload, the network header over the
    /// transport wire plus payload, and the footer its CRC over every
    /// frame byte that precedes it. Each step reads the finished wire
    /// image of the step before it, so the order is observable.
    pub fn calc_from_payload(&mut self) -> Result<()> {
        let rem = (self.header_bits() + self.payload.len() * 8) % 32;
        if rem != 0 {
            let fill = (32 - rem) / 8;
            trace!("padding payload with {fill} filler bytes");
            self.payload.resize(self.payload.len() + fill, 0);
        }

        let pseudo = self.net.pseudo();
        if let Some(transport) = self.transport.as_mut() {
            match transport
                .derived_mut()
                .calc_length_and_checksum(pseudo.as_ref(), &self.payload)
            {
                Ok(()) => trace!("transport derived fields computed"),
                Err(Error::NoCalcMethod) => debug!("transport header has no derived fields"),
                Err(err) => return Err(err),
            }
        }

        let mut net_payload = match self.transport.as_ref() {
            Some(transport) => transport.as_group().as_net_bytes()?,
            None => Vec::new(),
        };
        net_payload.extend_from_slice(&self.payload);

        let net = self.net.derived_mut();
        match net.calc_length_and_header_checksum(&net_payload) {
            Ok(()) => trace!("network derived fields computed"),
            Err(Error::NoCalcMethod) => {
                match net.calc_length_and_checksum(None, &net_payload) {
                    Ok(()) => trace!("network derived fields computed"),
                    Err(Error::NoCalcMethod) => debug!("network header has no derived fields"),
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }

        if self.footer.is_some() {
            let mut frame = match self.link.as_ref() {
                Some(link) => link.as_group().as_net_bytes()?,
                None => Vec::new(),
            };
            frame.extend_from_slice(&self.net.as_group().as_net_bytes()?);
            frame.extend_from_slice(&net_payload);

            let footer = self.footer.as_mut().unwrap();
            match footer.derived_mut().calc_crc(&frame) {
                Ok(()) => trace!("footer CRC computed over {} bytes", frame.len()),
                Err(Error::NoCalcMethod) => debug!("footer has no derived fields"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Parse an Ethernet-framed datagram back from its wire image.
    ///
    /// The ethertype must name a known network variant; the transport
    /// variant follows the IPv4 protocol number, and unknown protocols
    /// leave the transport slot empty with the bytes in the payload. A
    /// four-byte tail past the IPv4 total length is taken as the
    /// footer.
    pub fn from_net_bytes(data: &[u8]) -> Result<Full> {
        let link = ethernet::Header::from_net_bytes(data)?;
        if link.ethertype != ethernet::EtherType::Ipv4 {
            return Err(Error::UnknownVariantTag);
        }
        let data = &data[ethernet::HEADER_LEN..];

        let net = ipv4::Header::from_net_bytes(data)?;
        let header_len = net.byte_len();
        let total_len = net.total_len as usize;
        if total_len < header_len || data.len() < total_len {
            return Err(Error::InsufficientBytes);
        }
        let region = &data[header_len..total_len];

        let (transport, payload) = match net.protocol {
            ipv4::Protocol::Udp => {
                let header = udp::Header::from_net_bytes(region)?;
                (
                    Some(TransportHeader::Udp(header)),
                    &region[header.byte_len()..],
                )
            }
            ipv4::Protocol::Tcp => {
                let header = tcp::Header::from_net_bytes(region)?;
                (
                    Some(TransportHeader::Tcp(header)),
                    &region[header.byte_len()..],
                )
            }
            _ => (None, region),
        };

        let tail = &data[total_len..];
        let footer = match tail.len() {
            0 => None,
            4 => Some(LinkFooter::Ethernet(ethernet::Footer::from_net_bytes(
                tail,
            )?)),
            _ => return Err(Error::InsufficientBytes),
        };

        Ok(Full {
            link: Some(LinkHeader::Ethernet(link)),
            net: NetHeader::Ipv4(net),
            transport,
            payload: payload.to_vec(),
            footer,
        })
    }
}

impl BitFieldGroup for Full {
    fn display_name(&self) -> &'static str {
        "datagram"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Frame
    }

    fn layer(&self) -> u8 {
        2
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            match &self.link {
                Some(link) => Field::group("link header", link.as_group()),
                None => Field::absent("link header"),
            },
            Field::group("network header", self.net.as_group()),
            match &self.transport {
                Some(transport) => Field::group("transport header", transport.as_group()),
                None => Field::absent("transport header"),
            },
            Field::bytes("payload", &self.payload),
            match &self.footer {
                Some(footer) => Field::group("link footer", footer.as_group()),
                None => Field::absent("link footer"),
            },
        ]
    }
}

impl fmt::Display for Full {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "datagram [")?;
        if let Some(LinkHeader::Ethernet(header)) = &self.link {
            write!(f, "{header} | ")?;
        }
        match &self.net {
            NetHeader::Ipv4(header) => write!(f, "{header}")?,
            NetHeader::Icmp(packet) => write!(f, "{packet}")?,
        }
        match &self.transport {
            Some(TransportHeader::Udp(header)) => write!(f, " | {header}")?,
            Some(TransportHeader::Tcp(header)) => write!(f, " | {header}")?,
            None => {}
        }
        write!(f, " | {} payload bytes]", self.payload.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv4::Address;
    use pretty_assertions::assert_eq;

    fn endpoints() -> (Address, Address, Port, Port) {
        (
            Address([10, 0, 0, 1]),
            Address([10, 0, 0, 2]),
            Port(1024),
            Port(1025),
        )
    }

    #[test]
    fn udp_checksums_without_link_framing() {
        let (src, dst, sport, dport) = endpoints();
        let mut dgram = Full {
            link: None,
            net: NetHeader::Ipv4(ipv4::Header {
                protocol: ipv4::Protocol::Udp,
                src_addr: src,
                dst_addr: dst,
                ..ipv4::Header::default()
            }),
            transport: Some(TransportHeader::Udp(udp::Header::new(sport, dport))),
            payload: b"abcd".to_vec(),
            footer: None,
        };
        dgram.calc_from_payload().unwrap();

        // ipv4 + udp + 4 payload bytes is already 32-bit aligned.
        assert_eq!(dgram.payload, b"abcd");
        match &dgram.net {
            NetHeader::Ipv4(header) => {
                assert_eq!(header.total_len, 32);
                assert_eq!(header.checksum, 0x66cb);
            }
            _ => unreachable!(),
        }
        match &dgram.transport {
            Some(TransportHeader::Udp(header)) => {
                assert_eq!(header.length, 12);
                assert_eq!(header.checksum, 0x1f0c);
            }
            _ => unreachable!(),
        }

        let bytes = dgram.as_net_bytes().unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn ethernet_udp_end_to_end() {
        let (src, dst, sport, dport) = endpoints();
        let mut dgram =
            Full::init(2, &["eth", "ip", "udp"], b"Hello World!".to_vec(), "eth").unwrap();
        dgram.set_endpoints(src, dst, sport, dport);
        dgram.calc_from_payload().unwrap();

        // 12 payload bytes round up to 14 to align the 60-byte frame.
        assert_eq!(dgram.payload.len(), 14);
        assert_eq!(&dgram.payload[..12], b"Hello World!");
        match &dgram.net {
            NetHeader::Ipv4(header) => {
                assert_eq!(header.total_len, 42);
                assert_eq!(header.checksum, 0x66c1);
            }
            _ => unreachable!(),
        }
        match &dgram.transport {
            Some(TransportHeader::Udp(header)) => {
                assert_eq!(header.length, 22);
                assert_eq!(header.checksum, 0x91cf);
            }
            _ => unreachable!(),
        }

        let bytes = dgram.as_net_bytes().unwrap();
        assert_eq!(bytes.len(), 60);
        assert_eq!(bytes.len() % 4, 0);

        let parsed = Full::from_net_bytes(&bytes).unwrap();
        assert_eq!(parsed, dgram);
    }

    #[test]
    fn layer_3_defaults_link_header() {
        let dgram = Full::init(3, &["ip", "udp"], Vec::new(), "eth").unwrap();
        match dgram.link {
            Some(LinkHeader::Ethernet(header)) => {
                assert_eq!(header.dst_addr, ethernet::Address([0; 6]));
                assert_eq!(header.ethertype, ethernet::EtherType::Ipv4);
            }
            _ => unreachable!(),
        }
        match dgram.net {
            NetHeader::Ipv4(header) => assert_eq!(header.protocol, ipv4::Protocol::Udp),
            _ => unreachable!(),
        }

        let mut dgram = dgram;
        dgram.calc_from_payload().unwrap();
        let bytes = dgram.as_net_bytes().unwrap();
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn layer_4_defaults_both_headers() {
        let dgram = Full::init(4, &["tcp"], Vec::new(), "eth").unwrap();
        assert!(matches!(dgram.link, Some(LinkHeader::Ethernet(_))));
        match dgram.net {
            NetHeader::Ipv4(header) => assert_eq!(header.protocol, ipv4::Protocol::Tcp),
            _ => unreachable!(),
        }
        assert!(matches!(dgram.transport, Some(TransportHeader::Tcp(_))));
    }

    #[test]
    fn icmp_rides_at_the_network_slot() {
        let mut dgram = Full::init(3, &["icmp"], b"ping!".to_vec(), "eth").unwrap();
        dgram.calc_from_payload().unwrap();

        // eth(112) + icmp(64) + 5 payload bytes pads by 1.
        assert_eq!(dgram.payload.len(), 6);
        match &dgram.net {
            NetHeader::Icmp(packet) => assert_ne!(packet.checksum, 0),
            _ => unreachable!(),
        }
        assert_eq!(dgram.as_net_bytes().unwrap().len() % 4, 0);
    }

    #[test]
    fn alignment_holds_for_any_payload_size() {
        for len in 0..40 {
            let mut dgram =
                Full::init(2, &["eth", "ip", "udp"], vec![0xA5; len], "eth").unwrap();
            dgram.calc_from_payload().unwrap();
            let bytes = dgram.as_net_bytes().unwrap();
            assert_eq!(bytes.len() % 4, 0, "payload len {len}");
        }
    }

    #[test]
    fn footer_crc_covers_the_preceding_frame() {
        let mut dgram = Full::init(2, &["eth", "ip", "udp"], b"abcd".to_vec(), "eth").unwrap();
        dgram.calc_from_payload().unwrap();

        let bytes = dgram.as_net_bytes().unwrap();
        let body = &bytes[..bytes.len() - 4];
        match dgram.footer {
            Some(LinkFooter::Ethernet(footer)) => {
                assert_eq!(footer.crc, crc32fast::hash(body));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_eq!(
            Full::init(2, &["wifi", "ip"], Vec::new(), "eth").unwrap_err(),
            Error::InvalidHeader
        );
        assert_eq!(
            Full::init(3, &["ip"], Vec::new(), "wifi").unwrap_err(),
            Error::InvalidFooter
        );
        assert_eq!(
            Full::init(7, &["ip"], Vec::new(), "eth").unwrap_err(),
            Error::InvalidHeader
        );
        assert_eq!(
            Full::init(3, &[], Vec::new(), "eth").unwrap_err(),
            Error::InvalidHeader
        );
    }

    #[test]
    fn reparse_requires_known_ethertype() {
        let mut dgram = Full::init(2, &["eth", "ip"], vec![0; 2], "eth").unwrap();
        dgram.calc_from_payload().unwrap();
        let mut bytes = dgram.as_net_bytes().unwrap();
        // Corrupt the ethertype.
        bytes[12] = 0x86;
        bytes[13] = 0xdd;
        assert_eq!(Full::from_net_bytes(&bytes).unwrap_err(), Error::UnknownVariantTag);
    }
}
