/*! RFC-style bit diagrams for any [BitFieldGroup].

Wrap a record in a [PrettyPrinter] and display it:

```text
 0                   1                   2                   3
 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
|                          IPv4 header                          |
+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|version| header|    dscp   |ecn|        total length=32        | 0
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
...
```

The diagram is a 32-column bit grid: one cell per bit, fields separated
by `|`, a rule between rows, the word index of each row on the right,
and a boxed title for records that are not BASIC or OPTION. Byte-string
fields become a titled block whose body is a windowed hex dump, a
per-byte annotated dump, or an elision marker, depending on the printer
configuration. The printer only reads the value.
*/

use core::fmt;

use crate::bitfield::{BitFieldGroup, FieldValue, GroupKind};

const ROW_BITS: usize = 32;
const LINE_WIDTH: usize = 2 * ROW_BITS + 1;
const DUMP_WIDTH: usize = 59;

/// Renders a record as an IETF-style bit diagram through
/// `fmt::Display`.
pub struct PrettyPrinter<'a> {
    group: &'a dyn BitFieldGroup,
    enable_neat_strings: bool,
    enable_detailed_strings: bool,
}

impl<'a> PrettyPrinter<'a> {
    pub fn new(group: &'a dyn BitFieldGroup) -> PrettyPrinter<'a> {
        PrettyPrinter {
            group,
            enable_neat_strings: false,
            enable_detailed_strings: false,
        }
    }

    /// Render byte-string fields as a windowed hex dump.
    pub fn neat_strings(mut self, enable: bool) -> PrettyPrinter<'a> {
        self.enable_neat_strings = enable;
        self
    }

    /// Render byte-string fields byte by byte with hex, binary, and
    /// character annotation. Wins over `neat_strings`.
    pub fn detailed_strings(mut self, enable: bool) -> PrettyPrinter<'a> {
        self.enable_detailed_strings = enable;
        self
    }
}

impl fmt::Display for PrettyPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut grid = Grid {
            f,
            segments: Vec::new(),
            row_bits: 0,
            bit_offset: 0,
            neat: self.enable_neat_strings,
            detailed: self.enable_detailed_strings,
        };
        grid.ruler()?;
        grid.group(self.group)?;
        // The closing cutoff rule, once, at depth 0.
        grid.flush_row()?;
        grid.rule('-')
    }
}

struct Grid<'a, 'f> {
    f: &'a mut fmt::Formatter<'f>,
    /// Pending cells of the current row: bit count and label.
    segments: Vec<(usize, String)>,
    row_bits: usize,
    bit_offset: usize,
    neat: bool,
    detailed: bool,
}

impl Grid<'_, '_> {
    fn ruler(&mut self) -> fmt::Result {
        writeln!(
            self.f,
            " 0                   1                   2                   3"
        )?;
        writeln!(
            self.f,
            " 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1"
        )
    }

    fn rule(&mut self, dash: char) -> fmt::Result {
        for _ in 0..ROW_BITS {
            write!(self.f, "+{dash}")?;
        }
        writeln!(self.f, "+")
    }

    fn flush_row(&mut self) -> fmt::Result {
        if self.segments.is_empty() {
            return Ok(());
        }
        self.rule('-')?;
        let word = (self.bit_offset - self.row_bits) / ROW_BITS;
        write!(self.f, "|")?;
        for (cells, label) in core::mem::take(&mut self.segments) {
            let width = 2 * cells - 1;
            write!(self.f, "{label:^width$.width$}|")?;
        }
        writeln!(self.f, " {word}")?;
        self.row_bits = 0;
        Ok(())
    }

    fn title(&mut self, name: &str) -> fmt::Result {
        self.flush_row()?;
        self.rule('=')?;
        let inner = LINE_WIDTH - 2;
        writeln!(self.f, "|{name:^inner$.inner$}|")?;
        self.rule('=')
    }

    fn leaf(&mut self, label: &str, width: usize) -> fmt::Result {
        let mut remaining = width;
        let mut label = label;
        while remaining > 0 {
            let take = remaining.min(ROW_BITS - self.row_bits);
            self.segments.push((take, label.to_string()));
            self.row_bits += take;
            self.bit_offset += take;
            remaining -= take;
            // Continuation cells of a field spanning rows stay blank.
            label = "";
            if self.row_bits == ROW_BITS {
                self.flush_row()?;
            }
        }
        Ok(())
    }

    fn byte_block(&mut self, name: &str, bytes: &[u8]) -> fmt::Result {
        self.flush_row()?;
        self.rule('-')?;
        let inner = LINE_WIDTH - 4;
        writeln!(self.f, "| {:<inner$.inner$} |", format!("{name} ({} bytes)", bytes.len()))?;

        if self.detailed {
            for byte in bytes {
                let chr = if byte.is_ascii_graphic() || *byte == b' ' {
                    *byte as char
                } else {
                    '.'
                };
                let line = format!("0x{byte:02x}  0b{byte:08b}  '{chr}'");
                writeln!(self.f, "|   {line:<58.58}|")?;
            }
        } else if self.neat {
            let window_width = DUMP_WIDTH;
            for window in bytes.chunks(DUMP_WIDTH.div_ceil(3)) {
                let mut line = String::with_capacity(DUMP_WIDTH);
                for (n, byte) in window.iter().enumerate() {
                    if n != 0 {
                        line.push(' ');
                    }
                    line.push_str(&format!("{byte:02x}"));
                }
                writeln!(self.f, "|  {line:<window_width$.window_width$}  |")?;
            }
        } else {
            writeln!(self.f, "|   {:<58.58}|", "( elided )")?;
        }

        self.bit_offset += bytes.len() * 8;
        Ok(())
    }

    fn group(&mut self, group: &dyn BitFieldGroup) -> fmt::Result {
        match group.kind() {
            GroupKind::Basic | GroupKind::Option => {}
            _ => self.title(group.display_name())?,
        }
        for field in group.fields() {
            match field.value {
                FieldValue::Uint(value) => {
                    let label = if field.width > 16 {
                        format!("{}=0x{value:x}", field.name)
                    } else {
                        format!("{}={value}", field.name)
                    };
                    self.leaf(&label, field.width)?;
                }
                FieldValue::Bool(value) => {
                    self.leaf(if value { "1" } else { "0" }, 1)?;
                }
                FieldValue::Group(nested) => match nested.kind() {
                    GroupKind::Basic | GroupKind::Option => self.inline(field.name, nested)?,
                    _ => self.group(nested)?,
                },
                FieldValue::Bytes(bytes) => self.byte_block(field.name, bytes)?,
                FieldValue::Absent => {}
            }
        }
        Ok(())
    }

    /// A BASIC nested record is folded into the surrounding grid; a
    /// single-leaf one (an address) borrows the enclosing field's name.
    fn inline(&mut self, outer_name: &'static str, group: &dyn BitFieldGroup) -> fmt::Result {
        let fields = group.fields();
        for field in &fields {
            match field.value {
                FieldValue::Uint(value) => {
                    let name = if fields.len() == 1 { outer_name } else { field.name };
                    let label = if field.width > 16 {
                        format!("{name}=0x{value:x}")
                    } else {
                        format!("{name}={value}")
                    };
                    self.leaf(&label, field.width)?;
                }
                FieldValue::Bool(value) => self.leaf(if value { "1" } else { "0" }, 1)?,
                FieldValue::Group(nested) => self.inline(field.name, nested)?,
                FieldValue::Bytes(bytes) => self.byte_block(field.name, bytes)?,
                FieldValue::Absent => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::{Full, Ipv4Address, Port};

    fn sample() -> Full {
        let mut dgram =
            Full::init(2, &["eth", "ip", "udp"], b"Hello World!".to_vec(), "eth").unwrap();
        dgram.set_endpoints(
            Ipv4Address([10, 0, 0, 1]),
            Ipv4Address([10, 0, 0, 2]),
            Port(1024),
            Port(1025),
        );
        dgram.calc_from_payload().unwrap();
        dgram
    }

    #[test]
    fn header_diagram() {
        let dgram = sample();
        let out = PrettyPrinter::new(&dgram).to_string();

        assert!(out.starts_with(" 0                   1"));
        for title in ["datagram", "Ethernet header", "IPv4 header", "UDP header"] {
            assert!(out.contains(title), "missing title {title:?}");
        }
        // Labels are clipped to their cell, so assert on ones that fit.
        assert!(out.contains("total length=42"));
        assert!(out.contains("hop limit=64"));
        assert!(out.contains("payload (14 bytes)"));
        assert!(out.contains("( elided )"));
        // One closing cutoff rule at the very end.
        assert!(out.ends_with("+\n"));
    }

    #[test]
    fn word_indices_count_rows() {
        let dgram = sample();
        let out = PrettyPrinter::new(&dgram).to_string();
        assert!(out.contains("| 0\n"));
        assert!(out.contains("| 1\n"));
    }

    #[test]
    fn neat_dump_shows_hex_window() {
        let dgram = sample();
        let out = PrettyPrinter::new(&dgram).neat_strings(true).to_string();
        assert!(out.contains("48 65 6c 6c 6f"));
        assert!(!out.contains("( elided )"));
    }

    #[test]
    fn detailed_dump_annotates_bytes() {
        let dgram = sample();
        let out = PrettyPrinter::new(&dgram).detailed_strings(true).to_string();
        assert!(out.contains("0x48  0b01001000  'H'"));
    }

    #[test]
    fn printer_does_not_mutate() {
        let dgram = sample();
        let before = dgram.clone();
        let _ = PrettyPrinter::new(&dgram).to_string();
        assert_eq!(dgram, before);
    }
}
