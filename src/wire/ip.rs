//! Pieces shared by the internet-layer records: the 16-bit port leaf,
//! the RFC 1071 checksum, and the TCP/UDP pseudo-header.

use core::fmt;

use crate::bitfield::{BitFieldGroup, BitReader, Field};
use crate::wire::ipv4;
use crate::wire::Result;

/// A 16-bit transport port.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Port(pub u16);

impl BitFieldGroup for Port {
    fn display_name(&self) -> &'static str {
        "port"
    }

    fn layer(&self) -> u8 {
        4
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::uint("port", 16, self.0 as u64)]
    }
}

impl Port {
    pub fn from_net_bytes(data: &[u8]) -> Result<Port> {
        let mut reader = BitReader::new(data);
        Ok(Port(reader.read_uint(16)? as u16))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Port {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Port {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Port, D::Error> {
        <u16 as serde::Deserialize>::deserialize(deserializer).map(Port)
    }
}

/// The virtual bytes summed alongside a TCP or UDP segment: source
/// address, destination address, a zero byte, the protocol number, and
/// the 16-bit segment length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pseudo {
    pub src_addr: ipv4::Address,
    pub dst_addr: ipv4::Address,
    pub protocol: u8,
}

impl Pseudo {
    /// The non-complemented RFC 1071 sum of the pseudo-header for a
    /// segment of `length` bytes.
    pub fn sum(&self, length: u16) -> u16 {
        let mut proto_len = [0u8; 4];
        proto_len[1] = self.protocol;
        proto_len[2..4].copy_from_slice(&length.to_be_bytes());

        checksum::combine(&[
            checksum::data(&self.src_addr.0),
            checksum::data(&self.dst_addr.0),
            checksum::data(&proto_len),
        ])
    }
}

pub mod checksum {
    //! The 16-bit Internet checksum: big-endian words summed with
    //! end-around carry, complemented by the caller once the region is
    //! complete.

    use byteorder::{ByteOrder, NetworkEndian};

    const fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Compute an RFC 1071 compliant checksum (without the final
    /// complement). An odd trailing byte is paired with zero.
    pub fn data(mut data: &[u8]) -> u16 {
        let mut accum = 0;

        while data.len() >= 2 {
            accum += NetworkEndian::read_u16(data) as u32;
            data = &data[2..];
        }

        if let Some(&value) = data.first() {
            accum += (value as u32) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum += word as u32;
        }
        propagate_carries(accum)
    }
}
