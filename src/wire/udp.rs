//! The 64-bit UDP header.

use core::fmt;

use crate::bitfield::{BitFieldGroup, BitReader, Field, GroupKind};
use crate::wire::ip::{checksum, Port, Pseudo};
use crate::wire::{DerivedFields, Result};

pub const HEADER_LEN: usize = 8;

/// An options-free User Datagram Protocol header.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Header {
    pub src_port: Port,
    pub dst_port: Port,
    pub length: u16,
    pub checksum: u16,
}

impl Header {
    pub fn new(src_port: Port, dst_port: Port) -> Header {
        Header {
            src_port,
            dst_port,
            length: HEADER_LEN as u16,
            checksum: 0,
        }
    }

    pub fn from_net_bytes(data: &[u8]) -> Result<Header> {
        let mut reader = BitReader::new(data);
        Ok(Header {
            src_port: Port(reader.read_uint(16)? as u16),
            dst_port: Port(reader.read_uint(16)? as u16),
            length: reader.read_uint(16)? as u16,
            checksum: reader.read_uint(16)? as u16,
        })
    }
}

impl BitFieldGroup for Header {
    fn display_name(&self) -> &'static str {
        "UDP header"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Header
    }

    fn layer(&self) -> u8 {
        4
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::group("source port", &self.src_port),
            Field::group("destination port", &self.dst_port),
            Field::uint("length", 16, self.length as u64),
            Field::uint("checksum", 16, self.checksum as u64),
        ]
    }
}

impl DerivedFields for Header {
    /// Length = header + payload bytes; checksum per RFC 768 over the
    /// pseudo-header, the header with its checksum zeroed, and the
    /// payload.
    fn calc_length_and_checksum(&mut self, pseudo: Option<&Pseudo>, payload: &[u8]) -> Result<()> {
        self.length = (HEADER_LEN + payload.len()) as u16;
        self.checksum = 0;

        let mut parts = Vec::with_capacity(3);
        if let Some(pseudo) = pseudo {
            parts.push(pseudo.sum(self.length));
        }
        parts.push(checksum::data(&self.as_net_bytes()?));
        parts.push(checksum::data(payload));
        let value = !checksum::combine(&parts);

        // A zero transmitted checksum means "no checksum was generated";
        // an actually-zero sum is sent as all-ones instead, which is
        // arithmetically identical under RFC 1071.
        self.checksum = if value == 0 { 0xffff } else { value };
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "UDP src={} dst={} len={}",
            self.src_port, self.dst_port, self.length
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv4::Address;

    static HEADER_BYTES: [u8; 8] = [0x04, 0x00, 0x04, 0x01, 0x00, 0x0c, 0x1f, 0x0c];

    #[test]
    fn derived_length_and_checksum() {
        let mut header = Header::new(Port(1024), Port(1025));
        let pseudo = Pseudo {
            src_addr: Address([10, 0, 0, 1]),
            dst_addr: Address([10, 0, 0, 2]),
            protocol: 0x11,
        };
        header.calc_length_and_checksum(Some(&pseudo), b"abcd").unwrap();
        assert_eq!(header.length, 12);
        assert_eq!(header.checksum, 0x1f0c);
        assert_eq!(header.as_net_bytes().unwrap(), HEADER_BYTES);
    }

    #[test]
    fn round_trip() {
        let header = Header::from_net_bytes(&HEADER_BYTES).unwrap();
        assert_eq!(header.src_port, Port(1024));
        assert_eq!(header.dst_port, Port(1025));
        assert_eq!(header.length, 12);
        assert_eq!(header.bit_width(), 64);
        assert_eq!(header.as_net_bytes().unwrap(), HEADER_BYTES);
    }
}
