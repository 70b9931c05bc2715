//! The IPv4 address leaf and the 160-bit options-less IPv4 header.

use core::fmt;

use crate::bitfield::{BitFieldGroup, BitReader, Field, GroupKind};
use crate::wire::ip::checksum;
use crate::wire::{DerivedFields, Result};

pub const HEADER_LEN: usize = 20;

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// The unspecified address.
    pub const UNSPECIFIED: Address = Address([0; 4]);

    /// The broadcast address.
    pub const BROADCAST: Address = Address([0xff; 4]);

    /// Construct an address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }

    pub const fn to_bits(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub const fn from_bits(bits: u32) -> Address {
        Address(bits.to_be_bytes())
    }
}

impl BitFieldGroup for Address {
    fn display_name(&self) -> &'static str {
        "IPv4 address"
    }

    fn layer(&self) -> u8 {
        3
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::uint("address", 32, self.to_bits() as u64)]
    }
}

impl Address {
    pub fn from_net_bytes(data: &[u8]) -> Result<Address> {
        let mut reader = BitReader::new(data);
        Ok(Address::from_bits(reader.read_uint(32)? as u32))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let octets = self.0;
        write!(f, "{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Address, D::Error> {
        let s = <&str as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

enum_with_unknown! {
    /// Transport protocol numbers carried in the IPv4 header.
    pub enum Protocol(u8) {
        Icmp = 0x01,
        Tcp = 0x06,
        Udp = 0x11
    }
}

/// An IPv4 header without options, RFC 791 field order.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Header {
    pub version: u8,
    /// Header length in 32-bit words.
    pub header_len: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub total_len: u16,
    pub ident: u16,
    pub reserved: bool,
    pub dont_frag: bool,
    pub more_frags: bool,
    pub frag_offset: u16,
    pub hop_limit: u8,
    pub protocol: Protocol,
    pub checksum: u16,
    pub src_addr: Address,
    pub dst_addr: Address,
}

impl Default for Header {
    fn default() -> Header {
        Header {
            version: 4,
            header_len: (HEADER_LEN / 4) as u8,
            dscp: 0,
            ecn: 0,
            total_len: HEADER_LEN as u16,
            ident: 0,
            reserved: false,
            dont_frag: false,
            more_frags: false,
            frag_offset: 0,
            hop_limit: 64,
            protocol: Protocol::Unknown(0),
            checksum: 0,
            src_addr: Address::UNSPECIFIED,
            dst_addr: Address::UNSPECIFIED,
        }
    }
}

impl BitFieldGroup for Header {
    fn display_name(&self) -> &'static str {
        "IPv4 header"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Header
    }

    fn layer(&self) -> u8 {
        3
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::uint("version", 4, self.version as u64),
            Field::uint("header length", 4, self.header_len as u64),
            Field::uint("dscp", 6, self.dscp as u64),
            Field::uint("ecn", 2, self.ecn as u64),
            Field::uint("total length", 16, self.total_len as u64),
            Field::uint("identification", 16, self.ident as u64),
            Field::boolean("reserved", self.reserved),
            Field::boolean("don't fragment", self.dont_frag),
            Field::boolean("more fragments", self.more_frags),
            Field::uint("fragment offset", 13, self.frag_offset as u64),
            Field::uint("hop limit", 8, self.hop_limit as u64),
            Field::uint("protocol", 8, u8::from(self.protocol) as u64),
            Field::uint("header checksum", 16, self.checksum as u64),
            Field::group("source address", &self.src_addr),
            Field::group("destination address", &self.dst_addr),
        ]
    }
}

impl Header {
    pub fn from_net_bytes(data: &[u8]) -> Result<Header> {
        let mut reader = BitReader::new(data);
        Ok(Header {
            version: reader.read_uint(4)? as u8,
            header_len: reader.read_uint(4)? as u8,
            dscp: reader.read_uint(6)? as u8,
            ecn: reader.read_uint(2)? as u8,
            total_len: reader.read_uint(16)? as u16,
            ident: reader.read_uint(16)? as u16,
            reserved: reader.read_bool()?,
            dont_frag: reader.read_bool()?,
            more_frags: reader.read_bool()?,
            frag_offset: reader.read_uint(13)? as u16,
            hop_limit: reader.read_uint(8)? as u8,
            protocol: Protocol::from(reader.read_uint(8)? as u8),
            checksum: reader.read_uint(16)? as u16,
            src_addr: Address::from_net_bytes(reader.read_bytes(4)?)?,
            dst_addr: Address::from_net_bytes(reader.read_bytes(4)?)?,
        })
    }

    /// Validate the header checksum.
    pub fn verify_checksum(&self) -> Result<bool> {
        Ok(checksum::data(&self.as_net_bytes()?) == !0)
    }
}

impl DerivedFields for Header {
    /// Total length = header + payload; header checksum over the header
    /// bytes with the checksum field zeroed.
    fn calc_length_and_header_checksum(&mut self, payload: &[u8]) -> Result<()> {
        self.total_len = (self.byte_len() + payload.len()) as u16;
        self.checksum = 0;
        self.checksum = !checksum::data(&self.as_net_bytes()?);
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IPv4 src={} dst={} proto={:?} len={}",
            self.src_addr, self.dst_addr, self.protocol, self.total_len
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_header() -> Header {
        Header {
            protocol: Protocol::Udp,
            src_addr: Address([10, 0, 0, 1]),
            dst_addr: Address([10, 0, 0, 2]),
            ..Header::default()
        }
    }

    static HEADER_BYTES: [u8; 20] = [
        0x45, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11, 0x66, 0xcb, 0x0a, 0x00, 0x00,
        0x01, 0x0a, 0x00, 0x00, 0x02,
    ];

    #[test]
    fn width_and_length() {
        let header = sample_header();
        assert_eq!(header.bit_width(), 160);
        assert_eq!(header.byte_len(), HEADER_LEN);
    }

    #[test]
    fn derived_length_and_checksum() {
        let mut header = sample_header();
        header.calc_length_and_header_checksum(&[0u8; 12]).unwrap();
        assert_eq!(header.total_len, 32);
        assert_eq!(header.checksum, 0x66cb);
        assert_eq!(header.as_net_bytes().unwrap(), HEADER_BYTES);
        assert!(header.verify_checksum().unwrap());
    }

    #[test]
    fn round_trip() {
        let header = Header::from_net_bytes(&HEADER_BYTES).unwrap();
        assert_eq!(header.protocol, Protocol::Udp);
        assert_eq!(header.total_len, 32);
        assert_eq!(header.hop_limit, 64);
        assert_eq!(header.as_net_bytes().unwrap(), HEADER_BYTES);
    }

    #[test]
    fn oversized_version_is_rejected() {
        use crate::wire::Error;

        let header = Header {
            version: 16,
            ..sample_header()
        };
        assert_eq!(header.as_net_bytes(), Err(Error::InvalidWidth));
    }

    #[test]
    fn truncated_parse() {
        use crate::wire::Error;

        assert_eq!(
            Header::from_net_bytes(&HEADER_BYTES[..12]),
            Err(Error::InsufficientBytes)
        );
    }
}
