/*! The bit layout engine.

A record that wants a wire image describes itself as an ordered list of
named, bit-width-constrained [Field]s by implementing [BitFieldGroup].
The engine then provides serialization to network byte order, the
inverse is written per record with a [BitReader], and the same field
table drives the [pretty printer](crate::pretty_print).

Field declaration order is wire order; every field is packed MSB-first,
so the first declared field lands in the most-significant bits of the
first emitted byte. A record whose total width is not a multiple of
eight is legal in a nested position and is zero-padded to a byte
boundary when emitted at top level.
*/

mod bits;

pub use bits::{BitReader, BitWriter};

use crate::wire::Result;

/// Classification used by the formatter to decide whether a record gets
/// a boxed title in diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Basic,
    Option,
    Header,
    Packet,
    Frame,
}

/// The value slot of a single declared field.
pub enum FieldValue<'a> {
    /// Unsigned integer leaf, zero-extended to the declared width.
    Uint(u64),
    /// Single-bit boolean leaf.
    Bool(bool),
    /// Nested record, or the active arm of a tagged variant (the
    /// discriminator itself contributes nothing to the wire image).
    Group(&'a dyn BitFieldGroup),
    /// Raw byte string; only legal at byte-aligned positions.
    Bytes(&'a [u8]),
    /// Absent optional record; contributes zero bits.
    Absent,
}

/// One named field of a record, with its width in bits.
pub struct Field<'a> {
    pub name: &'static str,
    pub width: usize,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    pub fn uint(name: &'static str, width: usize, value: u64) -> Field<'a> {
        Field {
            name,
            width,
            value: FieldValue::Uint(value),
        }
    }

    pub fn boolean(name: &'static str, value: bool) -> Field<'a> {
        Field {
            name,
            width: 1,
            value: FieldValue::Bool(value),
        }
    }

    pub fn group(name: &'static str, group: &'a dyn BitFieldGroup) -> Field<'a> {
        Field {
            name,
            width: group.bit_width(),
            value: FieldValue::Group(group),
        }
    }

    pub fn bytes(name: &'static str, bytes: &'a [u8]) -> Field<'a> {
        Field {
            name,
            width: bytes.len() * 8,
            value: FieldValue::Bytes(bytes),
        }
    }

    pub fn absent(name: &'static str) -> Field<'a> {
        Field {
            name,
            width: 0,
            value: FieldValue::Absent,
        }
    }
}

/// A record with a declared sequence of fixed-width bit fields and a
/// uniform serialization contract.
///
/// Implementors provide the field table; the engine provides the wire
/// image. Parsing is the record's own business (every catalog record
/// has an inherent `from_net_bytes` built on [BitReader]), because only
/// the record knows how to rebuild itself from leaf values.
pub trait BitFieldGroup {
    /// Name used in diagrams.
    fn display_name(&self) -> &'static str;

    fn kind(&self) -> GroupKind {
        GroupKind::Basic
    }

    /// Advisory OSI-ish layer (2, 3, 4, or 7).
    fn layer(&self) -> u8 {
        7
    }

    /// The ordered field table. Wire order equals declaration order.
    fn fields(&self) -> Vec<Field<'_>>;

    /// Total width in bits. Absent optionals contribute zero.
    fn bit_width(&self) -> usize {
        self.fields().iter().map(|f| f.width).sum()
    }

    /// Emitted length in bytes: `ceil(bit_width / 8)`.
    fn byte_len(&self) -> usize {
        self.bit_width().div_ceil(8)
    }

    /// The wire image: fields concatenated in declaration order,
    /// MSB-first, big-endian.
    fn as_net_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BitWriter::with_capacity(self.byte_len());
        write_fields(&self.fields(), &mut writer)?;
        Ok(writer.finish())
    }

    /// The native-endian in-memory image of the folded integer,
    /// truncated to `byte_len` bytes. Diagnostic use on little-endian
    /// hosts only; transmission always goes through `as_net_bytes`.
    fn as_bytes(&self) -> Result<Vec<u8>> {
        let mut image = self.as_net_bytes()?;
        image.reverse();
        Ok(image)
    }
}

fn write_fields(fields: &[Field<'_>], writer: &mut BitWriter) -> Result<()> {
    for field in fields {
        match field.value {
            FieldValue::Uint(value) => writer.write_uint(value, field.width)?,
            FieldValue::Bool(value) => writer.write_bool(value)?,
            FieldValue::Group(group) => write_fields(&group.fields(), writer)?,
            FieldValue::Bytes(bytes) => writer.write_bytes(bytes)?,
            FieldValue::Absent => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::Error;

    // A 12-bit record: tag(3) flag(1) seq(8). Not byte-aligned on
    // purpose.
    struct Chunk {
        tag: u8,
        flag: bool,
        seq: u8,
    }

    impl BitFieldGroup for Chunk {
        fn display_name(&self) -> &'static str {
            "chunk"
        }

        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::uint("tag", 3, self.tag as u64),
                Field::boolean("flag", self.flag),
                Field::uint("seq", 8, self.seq as u64),
            ]
        }
    }

    struct Envelope {
        chunk: Chunk,
        pad: u8,
        trailer: Option<Chunk>,
    }

    impl BitFieldGroup for Envelope {
        fn display_name(&self) -> &'static str {
            "envelope"
        }

        fn kind(&self) -> GroupKind {
            GroupKind::Packet
        }

        fn fields(&self) -> Vec<Field<'_>> {
            let mut fields = vec![
                Field::group("chunk", &self.chunk),
                Field::uint("pad", 4, self.pad as u64),
            ];
            match &self.trailer {
                Some(trailer) => fields.push(Field::group("trailer", trailer)),
                None => fields.push(Field::absent("trailer")),
            }
            fields
        }
    }

    #[test]
    fn widths() {
        let chunk = Chunk {
            tag: 5,
            flag: true,
            seq: 0xAB,
        };
        assert_eq!(chunk.bit_width(), 12);
        assert_eq!(chunk.byte_len(), 2);
    }

    #[test]
    fn unaligned_record_is_padded_at_top_level() {
        let chunk = Chunk {
            tag: 0b101,
            flag: true,
            seq: 0xAB,
        };
        // 101 1 10101011 0000
        assert_eq!(chunk.as_net_bytes().unwrap(), vec![0b1011_1010, 0b1011_0000]);
    }

    #[test]
    fn nested_groups_pack_continuously() {
        let envelope = Envelope {
            chunk: Chunk {
                tag: 0b101,
                flag: false,
                seq: 0xFF,
            },
            pad: 0xC,
            trailer: None,
        };
        assert_eq!(envelope.bit_width(), 16);
        // 101 0 11111111 1100
        assert_eq!(
            envelope.as_net_bytes().unwrap(),
            vec![0b1010_1111, 0b1111_1100]
        );
    }

    #[test]
    fn absent_optional_contributes_zero_bits() {
        let chunk = |seq| Chunk {
            tag: 1,
            flag: false,
            seq,
        };
        let with = Envelope {
            chunk: chunk(2),
            pad: 3,
            trailer: Some(chunk(5)),
        };
        let without = Envelope {
            chunk: chunk(2),
            pad: 3,
            trailer: None,
        };
        assert_eq!(with.bit_width(), 28);
        assert_eq!(without.bit_width(), 16);
        assert_eq!(
            with.as_net_bytes().unwrap().len(),
            without.as_net_bytes().unwrap().len() + 2
        );
    }

    #[test]
    fn oversized_value_is_rejected() {
        let chunk = Chunk {
            tag: 0b1111, // does not fit 3 bits
            flag: false,
            seq: 0,
        };
        assert_eq!(chunk.as_net_bytes(), Err(Error::InvalidWidth));
    }

    #[test]
    fn diagnostic_image_is_byte_reversed() {
        let chunk = Chunk {
            tag: 0b101,
            flag: true,
            seq: 0xAB,
        };
        let mut net = chunk.as_net_bytes().unwrap();
        net.reverse();
        assert_eq!(chunk.as_bytes().unwrap(), net);
    }
}
