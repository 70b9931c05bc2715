//! The 64-bit ICMP packet header (echo-shaped `rest` word).

use core::fmt;

use crate::bitfield::{BitFieldGroup, BitReader, Field, GroupKind};
use crate::wire::ip::{checksum, Pseudo};
use crate::wire::{DerivedFields, Result};

enum_with_unknown! {
    /// Internet protocol control message type.
    pub enum Message(u8) {
        /// Echo reply
        EchoReply = 0,
        /// Destination unreachable
        DstUnreachable = 3,
        /// Echo request
        EchoRequest = 8,
        /// Time exceeded
        TimeExceeded = 11
    }
}

/// An ICMP packet header: type, code, checksum, and the
/// message-dependent rest-of-header word. The message body rides as the
/// datagram payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Packet {
    pub msg_type: Message,
    pub code: u8,
    pub checksum: u16,
    pub rest: u32,
}

impl Default for Message {
    fn default() -> Message {
        Message::EchoRequest
    }
}

impl Packet {
    /// An echo request with the given identifier and sequence number.
    pub fn echo(ident: u16, seq_no: u16) -> Packet {
        Packet {
            msg_type: Message::EchoRequest,
            code: 0,
            checksum: 0,
            rest: (ident as u32) << 16 | seq_no as u32,
        }
    }

    pub fn ident(&self) -> u16 {
        (self.rest >> 16) as u16
    }

    pub fn seq_no(&self) -> u16 {
        self.rest as u16
    }

    pub fn from_net_bytes(data: &[u8]) -> Result<Packet> {
        let mut reader = BitReader::new(data);
        Ok(Packet {
            msg_type: Message::from(reader.read_uint(8)? as u8),
            code: reader.read_uint(8)? as u8,
            checksum: reader.read_uint(16)? as u16,
            rest: reader.read_uint(32)? as u32,
        })
    }
}

impl BitFieldGroup for Packet {
    fn display_name(&self) -> &'static str {
        "ICMP packet"
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Packet
    }

    fn layer(&self) -> u8 {
        3
    }

    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::uint("type", 8, u8::from(self.msg_type) as u64),
            Field::uint("code", 8, self.code as u64),
            Field::uint("checksum", 16, self.checksum as u64),
            Field::uint("rest of header", 32, self.rest as u64),
        ]
    }
}

impl DerivedFields for Packet {
    /// ICMP has no length field and no pseudo-header; the checksum
    /// covers the header and the payload.
    fn calc_length_and_checksum(&mut self, _pseudo: Option<&Pseudo>, payload: &[u8]) -> Result<()> {
        self.checksum = 0;
        self.checksum = !checksum::combine(&[
            checksum::data(&self.as_net_bytes()?),
            checksum::data(payload),
        ]);
        Ok(())
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ICMP type={:?} code={} ident={} seq={}",
            self.msg_type,
            self.code,
            self.ident(),
            self.seq_no()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echo_checksum() {
        let mut packet = Packet::echo(1, 1);
        packet.calc_length_and_checksum(None, b"ping!").unwrap();
        assert_eq!(packet.checksum, 0xf82c);
        assert_eq!(
            packet.as_net_bytes().unwrap(),
            [0x08, 0x00, 0xf8, 0x2c, 0x00, 0x01, 0x00, 0x01]
        );
    }

    #[test]
    fn round_trip() {
        let packet = Packet::echo(0x1234, 7);
        let bytes = packet.as_net_bytes().unwrap();
        assert_eq!(bytes.len(), 8);
        let parsed = Packet::from_net_bytes(&bytes).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.ident(), 0x1234);
        assert_eq!(parsed.seq_no(), 7);
    }
}
