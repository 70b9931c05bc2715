//! Ethernet II framing: the six-octet address leaf, the 112-bit
//! header, and the 32-bit CRC footer.

use core::fmt;

use crate::bitfield::{BitFieldGroup, BitReader, Field, GroupKind};
use crate::wire::{DerivedFields, Result};

pub const HEADER_LEN: usize = 14;

/// A six-octet Ethernet II address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// Construct an address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Query whether the address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl BitFieldGroup for Address {
    fn display_name(&self) -> &'static str {
        "MAC address"
    }

    fn layer(&self) -> u8 {
        2
    }

    fn fields(&self) -> Vec<Field<'_>> {
        let mut value = 0u64;
        for &octet in self.0.iter() {
            value = value << 8 | octet as u64;
        }
        vec![Field::uint("address", 48, value)]
    }
}

impl Address {
    pub fn from_net_bytes(data: &[u8]) -> Result<Address> {
        let mut reader = BitReader::new(data);
        let value = reader.read_uint(48)?;
        Ok(Address(value.to_be_bytes()[2..8].try_into().unwrap()))
    }
}

impl fmt::Display for Address {
    /// Canonical form: uppercase hex octets joined with `:`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let octets = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            octets[0], octets[1], octets[2], octets[3], octets[4], octets[5]
        )
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
    /// Ethernet protocol type.
    pub enum EtherType(u16) {
        Ipv4 = 0x0800,
        Arp = 0x0806,
        Ipv6 = 0x86DD
    }
}

/// An Ethernet II frame header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Header {
    pub dst_addr: Address,
    pub src_addr: Address,
    pub ethertype: EtherType,
}

impl Default for Header {
    fn default() -> Header {
        Header {
            dst_addr: Address::default(),
            src_addr: Address::default(),
            ethertype: EtherType::Ipv4,
        }
    }
}

impl BitFieldGroup for Header {
    fn display_name(&self) -> &'static str {
        "Ethernet header"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Header
    }

    fn layer(&self) -> u8 {
        2
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::group("destination address", &self.dst_addr),
            Field::group("source address", &self.src_addr),
            Field::uint("ethertype", 16, u16::from(self.ethertype) as u64),
        ]
    }
}

impl Header {
    pub fn from_net_bytes(data: &[u8]) -> Result<Header> {
        let mut reader = BitReader::new(data);
        let dst_addr = Address::from_net_bytes(reader.read_bytes(6)?)?;
        let src_addr = Address::from_net_bytes(reader.read_bytes(6)?)?;
        let ethertype = EtherType::from(reader.read_uint(16)? as u16);
        Ok(Header {
            dst_addr,
            src_addr,
            ethertype,
        })
    }
}

// The header carries no derived field; the aggregator skips it.
impl DerivedFields for Header {}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "EthernetII src={} dst={} type={:?}",
            self.src_addr, self.dst_addr, self.ethertype
        )
    }
}

/// The Ethernet frame check sequence, kept as a separate record so the
/// aggregator can compute it over everything that precedes it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Footer {
    pub crc: u32,
}

impl BitFieldGroup for Footer {
    fn display_name(&self) -> &'static str {
        "Ethernet footer"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Header
    }

    fn layer(&self) -> u8 {
        2
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::uint("crc", 32, self.crc as u64)]
    }
}

impl Footer {
    pub fn from_net_bytes(data: &[u8]) -> Result<Footer> {
        let mut reader = BitReader::new(data);
        Ok(Footer {
            crc: reader.read_uint(32)? as u32,
        })
    }
}

impl DerivedFields for Footer {
    /// IEEE 802.3 CRC-32 (polynomial `0xEDB88320` reflected, initial
    /// value and final XOR `0xFFFFFFFF`) over the frame bytes excluding
    /// the footer itself.
    fn calc_crc(&mut self, frame: &[u8]) -> Result<()> {
        self.crc = crc32fast::hash(frame);
        Ok(())
    }
}
