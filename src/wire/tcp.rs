//! The 160-bit options-less TCP header.

use core::fmt;

use crate::bitfield::{BitFieldGroup, BitReader, Field, GroupKind};
use crate::wire::ip::{checksum, Port, Pseudo};
use crate::wire::{DerivedFields, Result};

pub const HEADER_LEN: usize = 20;

/// A Transmission Control Protocol header without options. Control bits
/// are individual boolean fields.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Header {
    pub src_port: Port,
    pub dst_port: Port,
    pub seq_number: u32,
    pub ack_number: u32,
    /// Data offset in 32-bit words.
    pub data_offset: u8,
    pub reserved: u8,
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
    pub window_len: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
}

impl Header {
    pub fn new(src_port: Port, dst_port: Port) -> Header {
        Header {
            src_port,
            dst_port,
            data_offset: (HEADER_LEN / 4) as u8,
            window_len: u16::MAX,
            ..Header::default()
        }
    }

    pub fn from_net_bytes(data: &[u8]) -> Result<Header> {
        let mut reader = BitReader::new(data);
        Ok(Header {
            src_port: Port(reader.read_uint(16)? as u16),
            dst_port: Port(reader.read_uint(16)? as u16),
            seq_number: reader.read_uint(32)? as u32,
            ack_number: reader.read_uint(32)? as u32,
            data_offset: reader.read_uint(4)? as u8,
            reserved: reader.read_uint(6)? as u8,
            urg: reader.read_bool()?,
            ack: reader.read_bool()?,
            psh: reader.read_bool()?,
            rst: reader.read_bool()?,
            syn: reader.read_bool()?,
            fin: reader.read_bool()?,
            window_len: reader.read_uint(16)? as u16,
            checksum: reader.read_uint(16)? as u16,
            urgent_ptr: reader.read_uint(16)? as u16,
        })
    }
}

impl BitFieldGroup for Header {
    fn display_name(&self) -> &'static str {
        "TCP header"
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
            Field::uint("sequence number", 32, self.seq_number as u64),
            Field::uint("acknowledgment number", 32, self.ack_number as u64),
            Field::uint("data offset", 4, self.data_offset as u64),
            Field::uint("reserved", 6, self.reserved as u64),
            Field::boolean("urg", self.urg),
            Field::boolean("ack", self.ack),
            Field::boolean("psh", self.psh),
            Field::boolean("rst", self.rst),
            Field::boolean("syn", self.syn),
            Field::boolean("fin", self.fin),
            Field::uint("window", 16, self.window_len as u64),
            Field::uint("checksum", 16, self.checksum as u64),
            Field::uint("urgent pointer", 16, self.urgent_ptr as u64),
        ]
    }
}

impl DerivedFields for Header {
    /// RFC 793 checksum over the pseudo-header (whose length covers
    /// header plus payload), the header with its checksum zeroed, and
    /// the payload. TCP carries no length field of its own.
    fn calc_length_and_checksum(&mut self, pseudo: Option<&Pseudo>, payload: &[u8]) -> Result<()> {
        let segment_len = (self.byte_len() + payload.len()) as u16;
        self.checksum = 0;

        let mut parts = Vec::with_capacity(3);
        if let Some(pseudo) = pseudo {
            parts.push(pseudo.sum(segment_len));
        }
        parts.push(checksum::data(&self.as_net_bytes()?));
        parts.push(checksum::data(payload));
        self.checksum = !checksum::combine(&parts);
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP src={} dst={}", self.src_port, self.dst_port)?;
        for (bit, label) in [
            (self.urg, " urg"),
            (self.ack, " ack"),
            (self.psh, " psh"),
            (self.rst, " rst"),
            (self.syn, " syn"),
            (self.fin, " fin"),
        ] {
            if bit {
                f.write_str(label)?;
            }
        }
        write!(f, " seq={}", self.seq_number)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv4::Address;
    use pretty_assertions::assert_eq;

    static SYN_BYTES: [u8; 20] = [
        0x04, 0x00, 0x04, 0x01, 0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0x00, 0x00, 0x50, 0x02, 0xfa,
        0xf0, 0x30, 0x42, 0x00, 0x00,
    ];

    fn syn_segment() -> Header {
        Header {
            seq_number: 0x1234_5678,
            syn: true,
            window_len: 64240,
            ..Header::new(Port(1024), Port(1025))
        }
    }

    #[test]
    fn derived_checksum() {
        let mut header = syn_segment();
        let pseudo = Pseudo {
            src_addr: Address([10, 0, 0, 1]),
            dst_addr: Address([10, 0, 0, 2]),
            protocol: 0x06,
        };
        header.calc_length_and_checksum(Some(&pseudo), &[]).unwrap();
        assert_eq!(header.checksum, 0x3042);
        assert_eq!(header.as_net_bytes().unwrap(), SYN_BYTES);
    }

    #[test]
    fn round_trip() {
        let header = Header::from_net_bytes(&SYN_BYTES).unwrap();
        assert_eq!(header.bit_width(), 160);
        assert!(header.syn);
        assert!(!header.ack);
        assert_eq!(header.data_offset, 5);
        assert_eq!(header.window_len, 64240);
        assert_eq!(header.as_net_bytes().unwrap(), SYN_BYTES);
    }
}
